use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::process;

use rand::Rng;

use crate::eval::Evaluator;
use crate::object::{Kind, Object};

pub type BuiltinFn = fn(&Evaluator, Vec<Object>) -> Object;

/// A native function, callable free (`len(x)`) and, when the receiver
/// kind is listed in `accepts`, as a method (`x.len()`).
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    /// Receiver kinds accepted in method position; empty means any.
    pub accepts: &'static [Kind],
    func: BuiltinFn,
}

impl Builtin {
    pub fn apply(&self, evaluator: &Evaluator, args: Vec<Object>) -> Object {
        (self.func)(evaluator, args)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The registry of native functions. Built once and handed to the
/// evaluator, so separate evaluators never share a table.
#[derive(Debug)]
pub struct Builtins {
    fns: BTreeMap<&'static str, Builtin>,
}

impl Builtins {
    pub fn standard() -> Self {
        let mut fns = BTreeMap::new();
        for builtin in CATALOG {
            fns.insert(builtin.name, *builtin);
        }

        Self { fns }
    }

    pub fn get(&self, name: &str) -> Option<Builtin> {
        self.fns.get(name).copied()
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Self::standard()
    }
}

const CATALOG: &[Builtin] = &[
    Builtin { name: "args", accepts: &[], func: args },
    Builtin { name: "contains", accepts: &[Kind::Str, Kind::Array], func: contains },
    Builtin { name: "echo", accepts: &[], func: echo },
    Builtin { name: "env", accepts: &[Kind::Str], func: env },
    Builtin { name: "exit", accepts: &[Kind::Number], func: exit },
    Builtin { name: "filter", accepts: &[Kind::Array], func: filter },
    Builtin { name: "first", accepts: &[Kind::Array], func: first },
    Builtin { name: "int", accepts: &[Kind::Number, Kind::Str], func: int },
    Builtin { name: "join", accepts: &[Kind::Array], func: join },
    Builtin { name: "keys", accepts: &[Kind::Hash], func: keys },
    Builtin { name: "last", accepts: &[Kind::Array], func: last },
    Builtin { name: "len", accepts: &[Kind::Str, Kind::Array], func: len },
    Builtin { name: "lines", accepts: &[Kind::Str], func: lines },
    Builtin { name: "lower", accepts: &[Kind::Str], func: lower },
    Builtin { name: "map", accepts: &[Kind::Array], func: map },
    Builtin { name: "number", accepts: &[Kind::Number, Kind::Str], func: number },
    Builtin { name: "ok", accepts: &[Kind::Str], func: ok },
    Builtin { name: "pop", accepts: &[Kind::Array], func: pop },
    Builtin { name: "push", accepts: &[Kind::Array], func: push },
    Builtin { name: "rand", accepts: &[Kind::Number], func: rand_int },
    Builtin { name: "replace", accepts: &[Kind::Str], func: replace },
    Builtin { name: "reverse", accepts: &[Kind::Array], func: reverse },
    Builtin { name: "sort", accepts: &[Kind::Array], func: sort },
    Builtin { name: "split", accepts: &[Kind::Str], func: split },
    Builtin { name: "str", accepts: &[], func: str },
    Builtin { name: "sum", accepts: &[Kind::Array], func: sum },
    Builtin { name: "trim", accepts: &[Kind::Str], func: trim },
    Builtin { name: "type", accepts: &[], func: type_of },
    Builtin { name: "upper", accepts: &[Kind::Str], func: upper },
    Builtin { name: "values", accepts: &[Kind::Hash], func: values },
];

/// Arity first, then per-position kind membership. Positions without a
/// kind list (or with an empty one) are left unchecked.
fn validate_args(name: &str, args: &[Object], want: usize, allowed: &[&[Kind]]) -> Option<Object> {
    if args.len() != want {
        return Some(Object::Error(format!(
            "wrong number of arguments to {}(...): got={}, want={}",
            name,
            args.len(),
            want
        )));
    }

    for (i, kinds) in allowed.iter().enumerate() {
        if kinds.is_empty() || kinds.contains(&args[i].kind()) {
            continue;
        }

        let list = kinds
            .iter()
            .map(Kind::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Some(Object::Error(format!(
            "argument {} to {}(...) is not supported (got: {}, allowed: {})",
            i,
            name,
            args[i].inspect(),
            list
        )));
    }

    None
}

fn type_error(name: &str, got: &Object) -> Object {
    Object::Error(format!(
        "argument to `{}` not supported, got {}",
        name,
        got.kind()
    ))
}

// args() -> the process argv
fn args(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("args", &args, 0, &[]) {
        return err;
    }

    Object::array(std::env::args().map(Object::str).collect())
}

// contains("str", "tr") / [1, 2].contains(2)
fn contains(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("contains", &args, 2, &[&[Kind::Str, Kind::Array]]) {
        return err;
    }

    match (&args[0], &args[1]) {
        (Object::Str(string), Object::Str(needle)) => {
            Object::Boolean(string.value.contains(needle.value.as_str()))
        }
        (Object::Str(_), other) => Object::Error(format!(
            "argument 1 to contains(...) is not supported (got: {}, allowed: STRING)",
            other.inspect()
        )),
        (Object::Array(elements), needle) => {
            Object::Boolean(elements.borrow().iter().any(|element| element == needle))
        }
        _ => type_error("contains", &args[0]),
    }
}

// echo("hello", 42)
fn echo(_: &Evaluator, args: Vec<Object>) -> Object {
    let parts: Vec<String> = args.iter().map(Object::inspect).collect();
    println!("{}", parts.join(" "));
    Object::Null
}

// env("HOME")
fn env(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("env", &args, 1, &[&[Kind::Str]]) {
        return err;
    }

    match &args[0] {
        Object::Str(name) => Object::str(std::env::var(&name.value).unwrap_or_default()),
        other => type_error("env", other),
    }
}

// exit(99) terminates the process; the one sanctioned hard exit.
fn exit(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("exit", &args, 1, &[&[Kind::Number]]) {
        return err;
    }

    match &args[0] {
        Object::Number(code) => process::exit(*code as i32),
        other => type_error("exit", other),
    }
}

// filter([1, 2, 3], f(x) { x > 1 })
fn filter(evaluator: &Evaluator, args: Vec<Object>) -> Object {
    let allowed: &[&[Kind]] = &[&[Kind::Array], &[Kind::Function, Kind::Builtin]];
    if let Some(err) = validate_args("filter", &args, 2, allowed) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => {
            let elements = elements.borrow().clone();
            let mut kept = Vec::new();
            for element in elements {
                let keep = evaluator.apply_function(args[1].clone(), vec![element.clone()]);
                if keep.is_error() {
                    return keep;
                }
                if keep.is_truthy() {
                    kept.push(element);
                }
            }
            Object::array(kept)
        }
        other => type_error("filter", other),
    }
}

// first([1, 2, 3])
fn first(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("first", &args, 1, &[&[Kind::Array]]) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => elements.borrow().first().cloned().unwrap_or(Object::Null),
        other => type_error("first", other),
    }
}

// int("12") -> 12, int(12.7) -> 12
fn int(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("int", &args, 1, &[&[Kind::Number, Kind::Str]]) {
        return err;
    }

    match &args[0] {
        Object::Number(value) => Object::Number(value.trunc()),
        Object::Str(string) => match string.value.parse::<i64>() {
            Ok(value) => Object::Number(value as f64),
            Err(_) => Object::Error(format!(
                "int(...) can only be called on strings which represent integers, '{}' given",
                string.value
            )),
        },
        other => type_error("int", other),
    }
}

// join(["a", "b"], "-")
fn join(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("join", &args, 2, &[&[Kind::Array], &[Kind::Str]]) {
        return err;
    }

    match (&args[0], &args[1]) {
        (Object::Array(elements), Object::Str(sep)) => {
            let elements = elements.borrow();
            let mut parts = Vec::with_capacity(elements.len());
            for element in elements.iter() {
                match element {
                    Object::Str(string) => parts.push(string.value.clone()),
                    other => {
                        return Object::Error(format!(
                            "join(...) can only be called on arrays of strings, got {}",
                            other.kind()
                        ))
                    }
                }
            }
            Object::str(parts.join(&sep.value))
        }
        _ => type_error("join", &args[0]),
    }
}

// keys({"a": 1}) in deterministic key order
fn keys(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("keys", &args, 1, &[&[Kind::Hash]]) {
        return err;
    }

    match &args[0] {
        Object::Hash(pairs) => {
            Object::array(pairs.borrow().values().map(|pair| pair.key.clone()).collect())
        }
        other => type_error("keys", other),
    }
}

// last([1, 2, 3])
fn last(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("last", &args, 1, &[&[Kind::Array]]) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => elements.borrow().last().cloned().unwrap_or(Object::Null),
        other => type_error("last", other),
    }
}

// len("hello") / len([1, 2])
fn len(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("len", &args, 1, &[&[Kind::Str, Kind::Array]]) {
        return err;
    }

    match &args[0] {
        Object::Str(string) => Object::Number(string.value.len() as f64),
        Object::Array(elements) => Object::Number(elements.borrow().len() as f64),
        other => type_error("len", other),
    }
}

// lines("a\nb")
fn lines(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("lines", &args, 1, &[&[Kind::Str]]) {
        return err;
    }

    match &args[0] {
        Object::Str(string) => {
            Object::array(string.value.split('\n').map(Object::str).collect())
        }
        other => type_error("lines", other),
    }
}

// lower("ABC")
fn lower(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("lower", &args, 1, &[&[Kind::Str]]) {
        return err;
    }

    match &args[0] {
        Object::Str(string) => Object::str(string.value.to_lowercase()),
        other => type_error("lower", other),
    }
}

// map([1, 2], f(x) { x * 2 })
fn map(evaluator: &Evaluator, args: Vec<Object>) -> Object {
    let allowed: &[&[Kind]] = &[&[Kind::Array], &[Kind::Function, Kind::Builtin]];
    if let Some(err) = validate_args("map", &args, 2, allowed) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => {
            let elements = elements.borrow().clone();
            let mut mapped = Vec::with_capacity(elements.len());
            for element in elements {
                let result = evaluator.apply_function(args[1].clone(), vec![element]);
                if result.is_error() {
                    return result;
                }
                mapped.push(result);
            }
            Object::array(mapped)
        }
        other => type_error("map", other),
    }
}

// number("1.5") -> 1.5
fn number(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("number", &args, 1, &[&[Kind::Number, Kind::Str]]) {
        return err;
    }

    match &args[0] {
        Object::Number(value) => Object::Number(*value),
        Object::Str(string) => match string.value.parse::<f64>() {
            Ok(value) => Object::Number(value),
            Err(_) => Object::Error(format!(
                "number(...) can only be called on strings which represent numbers, '{}' given",
                string.value
            )),
        },
        other => type_error("number", other),
    }
}

// $(ls).ok()
fn ok(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("ok", &args, 1, &[&[Kind::Str]]) {
        return err;
    }

    match &args[0] {
        Object::Str(string) => Object::Boolean(string.ok.unwrap_or(false)),
        other => type_error("ok", other),
    }
}

// pop([1, 2]) -> 2, removing it from the shared array
fn pop(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("pop", &args, 1, &[&[Kind::Array]]) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => elements.borrow_mut().pop().unwrap_or(Object::Null),
        other => type_error("pop", other),
    }
}

// push([1], 2) appends to the shared array and returns it
fn push(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("push", &args, 2, &[&[Kind::Array]]) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => {
            elements.borrow_mut().push(args[1].clone());
            args[0].clone()
        }
        other => type_error("push", other),
    }
}

// rand(20) -> integral in [0, 20)
fn rand_int(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("rand", &args, 1, &[&[Kind::Number]]) {
        return err;
    }

    match &args[0] {
        Object::Number(max) => {
            let max = max.trunc() as i64;
            if max < 1 {
                return Object::Error(format!(
                    "error occurred while calling 'rand({})': max must be positive",
                    args[0].inspect()
                ));
            }
            Object::Number(rand::thread_rng().gen_range(0..max) as f64)
        }
        other => type_error("rand", other),
    }
}

// replace("hello", "l", "L")
fn replace(_: &Evaluator, args: Vec<Object>) -> Object {
    let allowed: &[&[Kind]] = &[&[Kind::Str], &[Kind::Str], &[Kind::Str]];
    if let Some(err) = validate_args("replace", &args, 3, allowed) {
        return err;
    }

    match (&args[0], &args[1], &args[2]) {
        (Object::Str(string), Object::Str(from), Object::Str(to)) => {
            Object::str(string.value.replace(from.value.as_str(), &to.value))
        }
        _ => type_error("replace", &args[0]),
    }
}

// reverse([1, 2])
fn reverse(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("reverse", &args, 1, &[&[Kind::Array]]) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => {
            let mut elements = elements.borrow().clone();
            elements.reverse();
            Object::array(elements)
        }
        other => type_error("reverse", other),
    }
}

// sort([3, 1, 2]); homogeneous number or string arrays only
fn sort(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("sort", &args, 1, &[&[Kind::Array]]) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => {
            let elements = elements.borrow().clone();
            if elements.is_empty() {
                return Object::array(elements);
            }

            match &elements[0] {
                Object::Number(_) => {
                    let mut numbers = Vec::with_capacity(elements.len());
                    for element in &elements {
                        match element {
                            Object::Number(value) => numbers.push(*value),
                            _ => {
                                return Object::Error(String::from(
                                    "cannot sort an array with mixed types",
                                ))
                            }
                        }
                    }
                    numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                    Object::array(numbers.into_iter().map(Object::Number).collect())
                }
                Object::Str(_) => {
                    let mut strings = Vec::with_capacity(elements.len());
                    for element in &elements {
                        match element {
                            Object::Str(string) => strings.push(string.value.clone()),
                            _ => {
                                return Object::Error(String::from(
                                    "cannot sort an array with mixed types",
                                ))
                            }
                        }
                    }
                    strings.sort();
                    Object::array(strings.into_iter().map(Object::str).collect())
                }
                other => Object::Error(format!(
                    "can only sort arrays of numbers or strings, got {}",
                    other.kind()
                )),
            }
        }
        other => type_error("sort", other),
    }
}

// split("a,b", ",")
fn split(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("split", &args, 2, &[&[Kind::Str], &[Kind::Str]]) {
        return err;
    }

    match (&args[0], &args[1]) {
        (Object::Str(string), Object::Str(sep)) => {
            // An empty separator splits into characters.
            let parts: Vec<Object> = if sep.value.is_empty() {
                string.value.chars().map(|c| Object::str(c.to_string())).collect()
            } else {
                string.value.split(sep.value.as_str()).map(Object::str).collect()
            };
            Object::array(parts)
        }
        _ => type_error("split", &args[0]),
    }
}

// str(1.5) -> "1.5"
fn str(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("str", &args, 1, &[]) {
        return err;
    }

    Object::str(args[0].inspect())
}

// sum([1, 2, 3])
fn sum(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("sum", &args, 1, &[&[Kind::Array]]) {
        return err;
    }

    match &args[0] {
        Object::Array(elements) => {
            let mut total = 0.0;
            for element in elements.borrow().iter() {
                match element {
                    Object::Number(value) => total += value,
                    other => {
                        return Object::Error(format!(
                            "sum(...) can only be called on arrays of numbers, got {}",
                            other.kind()
                        ))
                    }
                }
            }
            Object::Number(total)
        }
        other => type_error("sum", other),
    }
}

// trim(" abc ")
fn trim(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("trim", &args, 1, &[&[Kind::Str]]) {
        return err;
    }

    match &args[0] {
        Object::Str(string) => Object::str(string.value.trim()),
        other => type_error("trim", other),
    }
}

// type(1) -> "NUMBER"
fn type_of(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("type", &args, 1, &[]) {
        return err;
    }

    Object::str(args[0].kind().to_string())
}

// upper("abc")
fn upper(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("upper", &args, 1, &[&[Kind::Str]]) {
        return err;
    }

    match &args[0] {
        Object::Str(string) => Object::str(string.value.to_uppercase()),
        other => type_error("upper", other),
    }
}

// values({"a": 1}) in deterministic key order
fn values(_: &Evaluator, args: Vec<Object>) -> Object {
    if let Some(err) = validate_args("values", &args, 1, &[&[Kind::Hash]]) {
        return err;
    }

    match &args[0] {
        Object::Hash(pairs) => Object::array(
            pairs
                .borrow()
                .values()
                .map(|pair| pair.value.clone())
                .collect(),
        ),
        other => type_error("values", other),
    }
}
