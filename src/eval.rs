use std::cell::RefCell;
use std::process::Command;
use std::rc::Rc;

use crate::ast::{Block, Expr, InfixOp, PrefixOp, Program, Scenario, Stmt};
use crate::builtins::Builtins;
use crate::env::{Environment, EnvironmentRef};
use crate::object::{ConchString, Function, HashKey, HashPair, HashPairs, Kind, Object};

/// Walks the tree and produces objects.
///
/// Runtime failures are `Object::Error` values, not Rust errors: every
/// rule checks its sub-results and hands errors up unchanged, so the
/// first failure surfaces as the result of the whole program.
pub struct Evaluator {
    builtins: Builtins,
}

impl Evaluator {
    pub fn new(builtins: Builtins) -> Self {
        Self { builtins }
    }

    /// Runs the top level. A `return` here unwraps to its inner value
    /// and stops the program, the way it would inside a function body.
    pub fn eval_program(&self, program: &Program, env: &EnvironmentRef) -> Object {
        let mut result = Object::Null;
        for statement in &program.statements {
            result = self.eval_stmt(statement, env);
            match result {
                Object::Return(value) => return *value,
                Object::Error(_) => return result,
                _ => {}
            }
        }
        result
    }

    /// Runs a `{ ... }` body. Unlike the top level, `return` and error
    /// objects pass through untouched so the enclosing construct can
    /// decide what they mean.
    fn eval_block(&self, block: &Block, env: &EnvironmentRef) -> Object {
        let mut result = Object::Null;
        for statement in block {
            result = self.eval_stmt(statement, env);
            if matches!(result, Object::Return(_) | Object::Error(_)) {
                return result;
            }
        }
        result
    }

    fn eval_stmt(&self, statement: &Stmt, env: &EnvironmentRef) -> Object {
        match statement {
            Stmt::Expression(expression) => self.eval_expr(expression, env),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expression) => self.eval_expr(expression, env),
                    None => Object::Null,
                };
                if value.is_error() {
                    return value;
                }
                Object::Return(Box::new(value))
            }
            Stmt::Assign { target, value } => {
                let value = self.eval_expr(value, env);
                if value.is_error() {
                    return value;
                }
                self.store(target, value, env)
            }
            Stmt::Destructure { names, value } => {
                let value = self.eval_expr(value, env);
                if value.is_error() {
                    return value;
                }
                self.destructure(names, value, env)
            }
        }
    }

    /// Writes `value` through an assignment target. A plain name walks
    /// the scope chain, binding locally only when nothing is found, so
    /// closures can update captured state.
    fn store(&self, target: &Expr, value: Object, env: &EnvironmentRef) -> Object {
        match target {
            Expr::Identifier(name) => {
                env.borrow_mut().assign(name, value);
                Object::Null
            }
            Expr::Index { left, index, .. } => {
                self.store_index(left, index.as_deref(), value, env)
            }
            Expr::Property {
                object, property, ..
            } => self.store_property(object, property, value, env),
            other => Object::Error(format!("cannot assign to {}", other)),
        }
    }

    fn store_index(
        &self,
        left: &Expr,
        index: Option<&Expr>,
        value: Object,
        env: &EnvironmentRef,
    ) -> Object {
        let container = self.eval_expr(left, env);
        if container.is_error() {
            return container;
        }
        let index = match index {
            Some(expression) => {
                let index = self.eval_expr(expression, env);
                if index.is_error() {
                    return index;
                }
                index
            }
            None => Object::Null,
        };

        match (&container, &index) {
            (Object::Array(elements), Object::Number(raw)) => {
                let idx = *raw as i64;
                if idx < 0 {
                    return Object::Error(format!("index out of range: {}", idx));
                }
                // Writing past the end grows the array with nulls.
                let idx = idx as usize;
                let mut elements = elements.borrow_mut();
                if idx >= elements.len() {
                    elements.resize(idx + 1, Object::Null);
                }
                elements[idx] = value;
                Object::Null
            }
            (Object::Array(_), _) => Object::Error(format!(
                "index operator not supported: {} on {}",
                index.inspect(),
                container.kind()
            )),
            (Object::Hash(pairs), _) => match index.hash_key() {
                Some(key) => {
                    pairs.borrow_mut().insert(
                        key,
                        HashPair {
                            key: index.clone(),
                            value,
                        },
                    );
                    Object::Null
                }
                None => Object::Error(format!("unusable as hash key: {}", index.kind())),
            },
            _ => Object::Error(format!(
                "index assignment not supported: {}",
                container.kind()
            )),
        }
    }

    fn store_property(
        &self,
        object: &Expr,
        property: &str,
        value: Object,
        env: &EnvironmentRef,
    ) -> Object {
        let target = self.eval_expr(object, env);
        if target.is_error() {
            return target;
        }
        match &target {
            Object::Hash(pairs) => {
                pairs.borrow_mut().insert(
                    HashKey::str(property),
                    HashPair {
                        key: Object::str(property),
                        value,
                    },
                );
                Object::Null
            }
            other => Object::Error(format!(
                "can only assign to hash property, got {}",
                other.kind()
            )),
        }
    }

    /// `[a, b] = value` binds array elements by position and hash
    /// values by key name; names without a counterpart become null.
    fn destructure(&self, names: &[String], value: Object, env: &EnvironmentRef) -> Object {
        match &value {
            Object::Array(elements) => {
                let elements = elements.borrow();
                for (i, name) in names.iter().enumerate() {
                    let bound = elements.get(i).cloned().unwrap_or(Object::Null);
                    env.borrow_mut().assign(name, bound);
                }
                Object::Null
            }
            Object::Hash(pairs) => {
                let pairs = pairs.borrow();
                for name in names {
                    let bound = pairs
                        .get(&HashKey::str(name.as_str()))
                        .map(|pair| pair.value.clone())
                        .unwrap_or(Object::Null);
                    env.borrow_mut().assign(name, bound);
                }
                Object::Null
            }
            other => Object::Error(format!(
                "can only destructure arrays and hashes, got {}",
                other.kind()
            )),
        }
    }

    fn eval_expr(&self, expression: &Expr, env: &EnvironmentRef) -> Object {
        match expression {
            Expr::Number(value) => Object::Number(*value),
            Expr::Str(value) => Object::str(value.clone()),
            Expr::Boolean(value) => Object::Boolean(*value),
            Expr::Null => Object::Null,
            Expr::Identifier(name) => self.eval_identifier(name, env),
            Expr::Command(text) => self.eval_command(text, env),
            Expr::Array(elements) => match self.eval_expressions(elements, env) {
                Ok(elements) => Object::array(elements),
                Err(err) => err,
            },
            Expr::Hash(entries) => self.eval_hash_literal(entries, env),
            Expr::Prefix { op, right } => {
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                eval_prefix(*op, right)
            }
            Expr::Infix { op, left, right } => self.eval_infix(*op, left, right, env),
            Expr::CompoundAssign { op, left, right } => {
                self.eval_compound_assign(*op, left, right, env)
            }
            Expr::If { scenarios } => self.eval_if(scenarios, env),
            Expr::While { condition, block } => self.eval_while(condition, block, env),
            Expr::For {
                ident,
                starter,
                condition,
                closer,
                block,
            } => self.eval_for(ident, starter, condition, closer, block, env),
            Expr::ForIn {
                key,
                value,
                iterable,
                block,
                alternative,
            } => self.eval_for_in(
                key.as_deref(),
                value,
                iterable,
                block,
                alternative.as_ref(),
                env,
            ),
            Expr::Function { name, params, body } => {
                self.eval_function_literal(name, params, body, env)
            }
            Expr::Decorator {
                expression,
                function,
            } => self.eval_decorator(expression, function, env),
            Expr::Call { function, args } => self.eval_call(function, args, env),
            Expr::Method {
                object,
                method,
                args,
                optional,
            } => self.eval_method(object, method, args, *optional, env),
            Expr::Index {
                left,
                index,
                end,
                is_range,
            } => self.eval_index(left, index.as_deref(), end.as_deref(), *is_range, env),
            Expr::Property {
                object,
                property,
                optional,
            } => self.eval_property(object, property, *optional, env),
        }
    }

    /// Evaluates left to right and stops at the first error.
    fn eval_expressions(
        &self,
        expressions: &[Expr],
        env: &EnvironmentRef,
    ) -> Result<Vec<Object>, Object> {
        let mut results = Vec::with_capacity(expressions.len());
        for expression in expressions {
            let value = self.eval_expr(expression, env);
            if value.is_error() {
                return Err(value);
            }
            results.push(value);
        }
        Ok(results)
    }

    fn eval_identifier(&self, name: &str, env: &EnvironmentRef) -> Object {
        if let Some(value) = env.borrow().get(name) {
            return value;
        }
        if let Some(builtin) = self.builtins.get(name) {
            return Object::Builtin(builtin);
        }
        Object::Error(format!("identifier not found: {}", name))
    }

    fn eval_infix(&self, op: InfixOp, left: &Expr, right: &Expr, env: &EnvironmentRef) -> Object {
        let left = self.eval_expr(left, env);
        if left.is_error() {
            return left;
        }

        // && and || yield one of the operands as written, not a bool.
        match op {
            InfixOp::And if !left.is_truthy() => return left,
            InfixOp::Or if left.is_truthy() => return left,
            InfixOp::And | InfixOp::Or => return self.eval_expr(right, env),
            _ => {}
        }

        let right = self.eval_expr(right, env);
        if right.is_error() {
            return right;
        }

        eval_infix_values(op, left, right)
    }

    /// `x += y` and friends: read, combine, write back. The expression
    /// yields the stored value.
    fn eval_compound_assign(
        &self,
        op: InfixOp,
        left: &Expr,
        right: &Expr,
        env: &EnvironmentRef,
    ) -> Object {
        let current = self.eval_expr(left, env);
        if current.is_error() {
            return current;
        }
        let operand = self.eval_expr(right, env);
        if operand.is_error() {
            return operand;
        }

        let result = eval_infix_values(op, current, operand);
        if result.is_error() {
            return result;
        }

        let stored = self.store(left, result.clone(), env);
        if stored.is_error() {
            return stored;
        }
        result
    }

    /// Scenarios are tested in order; the first truthy condition wins
    /// and no match means null.
    fn eval_if(&self, scenarios: &[Scenario], env: &EnvironmentRef) -> Object {
        for scenario in scenarios {
            let condition = self.eval_expr(&scenario.condition, env);
            if condition.is_error() {
                return condition;
            }
            if condition.is_truthy() {
                return self.eval_block(&scenario.consequence, env);
            }
        }
        Object::Null
    }

    fn eval_while(&self, condition: &Expr, block: &Block, env: &EnvironmentRef) -> Object {
        loop {
            let holds = self.eval_expr(condition, env);
            if holds.is_error() {
                return holds;
            }
            if !holds.is_truthy() {
                return Object::Null;
            }

            let result = self.eval_block(block, env);
            if matches!(result, Object::Return(_) | Object::Error(_)) {
                return result;
            }
        }
    }

    /// The loop variable belongs to the loop: whatever binding `ident`
    /// had before is put back afterwards, even when the loop exits with
    /// a return or an error.
    fn eval_for(
        &self,
        ident: &str,
        starter: &Stmt,
        condition: &Expr,
        closer: &Stmt,
        block: &Block,
        env: &EnvironmentRef,
    ) -> Object {
        let saved = env.borrow().get(ident);
        let result = self.run_for(starter, condition, closer, block, env);
        restore_binding(ident, saved, env);
        result
    }

    fn run_for(
        &self,
        starter: &Stmt,
        condition: &Expr,
        closer: &Stmt,
        block: &Block,
        env: &EnvironmentRef,
    ) -> Object {
        let started = self.eval_stmt(starter, env);
        if started.is_error() {
            return started;
        }

        loop {
            let holds = self.eval_expr(condition, env);
            if holds.is_error() {
                return holds;
            }
            if !holds.is_truthy() {
                return Object::Null;
            }

            let result = self.eval_block(block, env);
            if matches!(result, Object::Return(_) | Object::Error(_)) {
                return result;
            }

            let closed = self.eval_stmt(closer, env);
            if closed.is_error() {
                return closed;
            }
        }
    }

    fn eval_for_in(
        &self,
        key: Option<&str>,
        value: &str,
        iterable: &Expr,
        block: &Block,
        alternative: Option<&Block>,
        env: &EnvironmentRef,
    ) -> Object {
        let iterable = self.eval_expr(iterable, env);
        if iterable.is_error() {
            return iterable;
        }

        let pairs = match iterable.iter_pairs() {
            Some(pairs) => pairs,
            None => {
                return Object::Error(format!(
                    "'{}' is a {}, not an iterable, cannot be used in for loop",
                    iterable.inspect(),
                    iterable.kind()
                ))
            }
        };

        let saved_key = key.map(|name| (name, env.borrow().get(name)));
        let saved_value = env.borrow().get(value);

        let result = self.run_for_in(key, value, &pairs, block, alternative, env);

        if let Some((name, saved)) = saved_key {
            restore_binding(name, saved, env);
        }
        restore_binding(value, saved_value, env);
        result
    }

    fn run_for_in(
        &self,
        key: Option<&str>,
        value: &str,
        pairs: &[(Object, Object)],
        block: &Block,
        alternative: Option<&Block>,
        env: &EnvironmentRef,
    ) -> Object {
        // An empty iterable runs the else block when one is given.
        if pairs.is_empty() {
            return match alternative {
                Some(block) => self.eval_block(block, env),
                None => Object::Null,
            };
        }

        for (k, v) in pairs {
            if let Some(name) = key {
                env.borrow_mut().assign(name, k.clone());
            }
            env.borrow_mut().assign(value, v.clone());

            let result = self.eval_block(block, env);
            if matches!(result, Object::Return(_) | Object::Error(_)) {
                return result;
            }
        }
        Object::Null
    }

    /// A named literal also binds itself, so `f fib(n) { ... fib(...) }`
    /// can recurse without a separate assignment.
    fn eval_function_literal(
        &self,
        name: &Option<String>,
        params: &[String],
        body: &Block,
        env: &EnvironmentRef,
    ) -> Object {
        let function = Object::Function(Rc::new(Function {
            name: name.clone(),
            params: params.to_vec(),
            body: body.clone(),
            env: env.clone(),
        }));

        if let Some(name) = name {
            env.borrow_mut().assign(name, function.clone());
        }

        function
    }

    /// `@deco f name() { ... }` rebinds `name` to `deco(name)`. Stacked
    /// decorators nest right to left, so the innermost function is
    /// wrapped first. The whole form evaluates to null.
    fn eval_decorator(&self, expression: &Expr, function: &Expr, env: &EnvironmentRef) -> Object {
        let (name, decorated) = match self.apply_decorator(expression, function, env) {
            Ok(bound) => bound,
            Err(err) => return err,
        };

        env.borrow_mut().assign(&name, decorated);
        Object::Null
    }

    fn apply_decorator(
        &self,
        expression: &Expr,
        function: &Expr,
        env: &EnvironmentRef,
    ) -> Result<(String, Object), Object> {
        let decorator = self.eval_expr(expression, env);
        if decorator.is_error() {
            return Err(decorator);
        }
        if decorator.kind() != Kind::Function {
            return Err(Object::Error(format!(
                "decorator must be a function, got {}",
                decorator.kind()
            )));
        }

        let (name, target) = match function {
            Expr::Function {
                name: Some(name),
                params,
                body,
            } => {
                let target = Object::Function(Rc::new(Function {
                    name: Some(name.clone()),
                    params: params.to_vec(),
                    body: body.clone(),
                    env: env.clone(),
                }));
                (name.clone(), target)
            }
            Expr::Decorator {
                expression,
                function,
            } => self.apply_decorator(expression, function, env)?,
            _ => {
                return Err(Object::Error(
                    "error while processing decorator: unable to find the name of the function you're trying to decorate"
                        .to_string(),
                ))
            }
        };

        let decorated = self.apply_function(decorator, vec![target]);
        if decorated.is_error() {
            return Err(decorated);
        }
        Ok((name, decorated))
    }

    fn eval_call(&self, function: &Expr, args: &[Expr], env: &EnvironmentRef) -> Object {
        let function = self.eval_expr(function, env);
        if function.is_error() {
            return function;
        }

        let args = match self.eval_expressions(args, env) {
            Ok(args) => args,
            Err(err) => return err,
        };

        self.apply_function(function, args)
    }

    /// Calls a function or builtin object with already evaluated
    /// arguments. Builtins like `map` come back through here to invoke
    /// the functions handed to them.
    pub(crate) fn apply_function(&self, function: Object, args: Vec<Object>) -> Object {
        match function {
            Object::Function(function) => {
                if args.len() != function.params.len() {
                    return Object::Error(format!(
                        "wrong number of arguments to {}: got={}, want={}",
                        function_head(&function),
                        args.len(),
                        function.params.len()
                    ));
                }

                let mut scope = Environment::with_enclosing(function.env.clone());
                for (param, arg) in function.params.iter().zip(args) {
                    scope.define(param, arg);
                }
                let scope = EnvironmentRef::from(scope);

                unwrap_return(self.eval_block(&function.body, &scope))
            }
            Object::Builtin(builtin) => builtin.apply(self, args),
            other => Object::Error(format!("not a function: {}", other.kind())),
        }
    }

    fn eval_method(
        &self,
        object: &Expr,
        method: &str,
        args: &[Expr],
        optional: bool,
        env: &EnvironmentRef,
    ) -> Object {
        let receiver = self.eval_expr(object, env);
        if receiver.is_error() {
            return receiver;
        }

        // x?.method() on null answers null before arguments run.
        if optional && receiver == Object::Null {
            return Object::Null;
        }

        let args = match self.eval_expressions(args, env) {
            Ok(args) => args,
            Err(err) => return err,
        };

        self.apply_method(receiver, method, args, optional)
    }

    fn apply_method(
        &self,
        receiver: Object,
        method: &str,
        mut args: Vec<Object>,
        optional: bool,
    ) -> Object {
        // A hash holding a function under the method name wins over any
        // builtin and is called without the receiver.
        if let Object::Hash(pairs) = &receiver {
            let held = pairs
                .borrow()
                .get(&HashKey::str(method))
                .map(|pair| pair.value.clone());
            if let Some(function @ Object::Function(_)) = held {
                return self.apply_function(function, args);
            }
        }

        let builtin = match self.builtins.get(method) {
            Some(builtin) => builtin,
            None if optional => return Object::Null,
            None => {
                return Object::Error(format!(
                    "{} does not have method '{}()'",
                    receiver.kind(),
                    method
                ))
            }
        };

        if !builtin.accepts.is_empty() && !builtin.accepts.contains(&receiver.kind()) {
            return Object::Error(format!(
                "cannot call method '{}()' on '{}'",
                method,
                receiver.kind()
            ));
        }

        args.insert(0, receiver);
        builtin.apply(self, args)
    }

    fn eval_property(
        &self,
        object: &Expr,
        property: &str,
        optional: bool,
        env: &EnvironmentRef,
    ) -> Object {
        let receiver = self.eval_expr(object, env);
        if receiver.is_error() {
            return receiver;
        }

        match &receiver {
            Object::Str(string) if property == "ok" => Object::Boolean(string.ok.unwrap_or(false)),
            Object::Hash(pairs) => pairs
                .borrow()
                .get(&HashKey::str(property))
                .map(|pair| pair.value.clone())
                .unwrap_or(Object::Null),
            _ if optional => Object::Null,
            _ => Object::Error(format!(
                "invalid property '{}' on type {}",
                property,
                receiver.kind()
            )),
        }
    }

    fn eval_index(
        &self,
        left: &Expr,
        index: Option<&Expr>,
        end: Option<&Expr>,
        is_range: bool,
        env: &EnvironmentRef,
    ) -> Object {
        let container = self.eval_expr(left, env);
        if container.is_error() {
            return container;
        }

        // x[:b] leaves the start out, which means zero.
        let index = match index {
            Some(expression) => {
                let index = self.eval_expr(expression, env);
                if index.is_error() {
                    return index;
                }
                index
            }
            None => Object::Number(0.0),
        };
        let end = match end {
            Some(expression) => {
                let end = self.eval_expr(expression, env);
                if end.is_error() {
                    return end;
                }
                end
            }
            None => Object::Null,
        };

        match (&container, &index) {
            (Object::Array(elements), Object::Number(idx)) if is_range => {
                array_range(elements, *idx, &end)
            }
            (Object::Array(elements), Object::Number(idx)) => array_single(elements, *idx),
            (Object::Str(string), Object::Number(idx)) if is_range => {
                string_range(string, *idx, &end)
            }
            (Object::Str(string), Object::Number(idx)) => string_single(string, *idx),
            (Object::Hash(pairs), _) => hash_index(pairs, &index),
            _ => Object::Error(format!(
                "index operator not supported: {} on {}",
                index.inspect(),
                container.kind()
            )),
        }
    }

    fn eval_hash_literal(&self, entries: &[(Expr, Expr)], env: &EnvironmentRef) -> Object {
        let mut pairs = HashPairs::new();
        for (key_expression, value_expression) in entries {
            let key = self.eval_expr(key_expression, env);
            if key.is_error() {
                return key;
            }
            let hash_key = match key.hash_key() {
                Some(hash_key) => hash_key,
                None => return Object::Error(format!("unusable as hash key: {}", key.kind())),
            };

            let value = self.eval_expr(value_expression, env);
            if value.is_error() {
                return value;
            }

            pairs.insert(hash_key, HashPair { key, value });
        }
        Object::hash(pairs)
    }

    /// Runs `$(...)` through the system shell. The exit status lands on
    /// the resulting string as `.ok` and the captured output is
    /// whitespace-trimmed: stdout on success, stderr on failure.
    fn eval_command(&self, text: &str, env: &EnvironmentRef) -> Object {
        let command = interpolate(text.trim_matches(' '), env);

        let output = if cfg!(windows) {
            Command::new("cmd.exe").arg("/C").arg(&command).output()
        } else {
            Command::new("bash").arg("-c").arg(&command).output()
        };

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Object::command_result(stdout.trim(), true)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Object::command_result(stderr.trim(), false)
            }
            Err(err) => Object::command_result(err.to_string(), false),
        }
    }
}

fn eval_prefix(op: PrefixOp, right: Object) -> Object {
    match op {
        PrefixOp::Bang => Object::Boolean(!right.is_truthy()),
        PrefixOp::Minus => match right {
            Object::Number(value) => Object::Number(-value),
            other => Object::Error(format!("unknown operator: -{}", other.kind())),
        },
    }
}

fn eval_infix_values(op: InfixOp, left: Object, right: Object) -> Object {
    match (&left, &right) {
        (Object::Number(a), Object::Number(b)) => eval_number_infix(op, *a, *b),
        (Object::Str(a), Object::Str(b)) => match op {
            InfixOp::Plus => Object::str(format!("{}{}", a.value, b.value)),
            InfixOp::Eq => Object::Boolean(a.value == b.value),
            InfixOp::NotEq => Object::Boolean(a.value != b.value),
            InfixOp::Tilde => Object::Boolean(a.value.to_lowercase() == b.value.to_lowercase()),
            _ => unknown_operator(op, &left, &right),
        },
        (Object::Array(a), Object::Array(b)) => match op {
            InfixOp::Plus => {
                let mut elements = a.borrow().clone();
                elements.extend(b.borrow().iter().cloned());
                Object::array(elements)
            }
            // Equality between containers is identity, not contents.
            InfixOp::Eq => Object::Boolean(Rc::ptr_eq(a, b)),
            InfixOp::NotEq => Object::Boolean(!Rc::ptr_eq(a, b)),
            _ => unknown_operator(op, &left, &right),
        },
        (Object::Hash(a), Object::Hash(b)) => match op {
            InfixOp::Eq => Object::Boolean(Rc::ptr_eq(a, b)),
            InfixOp::NotEq => Object::Boolean(!Rc::ptr_eq(a, b)),
            _ => unknown_operator(op, &left, &right),
        },
        _ => match op {
            InfixOp::Eq => Object::Boolean(left == right),
            InfixOp::NotEq => Object::Boolean(left != right),
            _ if left.kind() != right.kind() => Object::Error(format!(
                "type mismatch: {} {} {}",
                left.kind(),
                op,
                right.kind()
            )),
            _ => unknown_operator(op, &left, &right),
        },
    }
}

fn eval_number_infix(op: InfixOp, left: f64, right: f64) -> Object {
    match op {
        InfixOp::Plus => Object::Number(left + right),
        InfixOp::Minus => Object::Number(left - right),
        InfixOp::Asterisk => Object::Number(left * right),
        InfixOp::Slash => Object::Number(left / right),
        InfixOp::Power => Object::Number(left.powf(right)),
        InfixOp::Modulo => Object::Number(left % right),
        InfixOp::Lt => Object::Boolean(left < right),
        InfixOp::Gt => Object::Boolean(left > right),
        InfixOp::LtEq => Object::Boolean(left <= right),
        InfixOp::GtEq => Object::Boolean(left >= right),
        InfixOp::Cmp => Object::Number(if left == right {
            0.0
        } else if left > right {
            1.0
        } else {
            -1.0
        }),
        InfixOp::Eq => Object::Boolean(left == right),
        InfixOp::NotEq => Object::Boolean(left != right),
        // ~ compares the integer parts.
        InfixOp::Tilde => Object::Boolean(left.trunc() == right.trunc()),
        // a..b is an ascending inclusive array; an empty one when a > b.
        InfixOp::Range => {
            let mut elements = Vec::new();
            let mut i = left;
            while i <= right {
                elements.push(Object::Number(i));
                i += 1.0;
            }
            Object::array(elements)
        }
        InfixOp::And | InfixOp::Or => {
            Object::Error(format!("unknown operator: NUMBER {} NUMBER", op))
        }
    }
}

fn unknown_operator(op: InfixOp, left: &Object, right: &Object) -> Object {
    Object::Error(format!(
        "unknown operator: {} {} {}",
        left.kind(),
        op,
        right.kind()
    ))
}

fn unwrap_return(result: Object) -> Object {
    match result {
        Object::Return(value) => *value,
        other => other,
    }
}

/// `name(a, b)` for error messages; anonymous functions print as `f`.
fn function_head(function: &Function) -> String {
    format!(
        "{}({})",
        function.name.as_deref().unwrap_or("f"),
        function.params.join(", ")
    )
}

fn restore_binding(name: &str, saved: Option<Object>, env: &EnvironmentRef) {
    match saved {
        Some(value) => env.borrow_mut().assign(name, value),
        None => {
            env.borrow_mut().delete(name);
        }
    }
}

fn array_single(elements: &RefCell<Vec<Object>>, idx: f64) -> Object {
    let elements = elements.borrow();
    if idx < 0.0 || idx >= elements.len() as f64 {
        return Object::Null;
    }
    elements[idx as usize].clone()
}

fn array_range(elements: &RefCell<Vec<Object>>, start: f64, end: &Object) -> Object {
    let elements = elements.borrow();
    match range_bounds(start, end, elements.len()) {
        Ok((start, end)) => Object::array(elements[start..end].to_vec()),
        Err(err) => err,
    }
}

/// Strings index and slice by byte; a slice through the middle of a
/// multi-byte character keeps going with replacement characters.
fn string_single(string: &ConchString, idx: f64) -> Object {
    let bytes = string.value.as_bytes();
    if idx < 0.0 || idx >= bytes.len() as f64 {
        return Object::Null;
    }
    Object::str((bytes[idx as usize] as char).to_string())
}

fn string_range(string: &ConchString, start: f64, end: &Object) -> Object {
    let bytes = string.value.as_bytes();
    match range_bounds(start, end, bytes.len()) {
        Ok((start, end)) => Object::str(String::from_utf8_lossy(&bytes[start..end]).into_owned()),
        Err(err) => err,
    }
}

/// Clamps `[start:end]` to `0..len`: a negative start becomes zero, a
/// negative end counts back from the length and a null end means the
/// length. A start past the end selects nothing.
fn range_bounds(start: f64, end: &Object, len: usize) -> Result<(usize, usize), Object> {
    let len = len as i64;
    let start = (start.trunc() as i64).max(0);

    let max = match end {
        Object::Null => len,
        Object::Number(value) => {
            let end = value.trunc() as i64;
            if end < 0 {
                (len + end).max(0)
            } else {
                end.min(len)
            }
        }
        other => {
            return Err(Object::Error(format!(
                "index ranges can only be numerical: got \"{}\" (type {})",
                other.inspect(),
                other.kind()
            )))
        }
    };

    if start > max {
        return Ok((0, 0));
    }
    Ok((start as usize, max as usize))
}

fn hash_index(pairs: &RefCell<HashPairs>, index: &Object) -> Object {
    match index.hash_key() {
        Some(key) => pairs
            .borrow()
            .get(&key)
            .map(|pair| pair.value.clone())
            .unwrap_or(Object::Null),
        None => Object::Error(format!("unusable as hash key: {}", index.kind())),
    }
}

/// Splices `$name` and `${name}` into command text using the printed
/// form of the binding; unbound names become the empty string. `\$`
/// keeps a literal dollar and an unterminated `${` is left as written.
fn interpolate(command: &str, env: &EnvironmentRef) -> String {
    let mut out = String::with_capacity(command.len());
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'$') {
            chars.next();
            out.push('$');
            continue;
        }
        if c != '$' {
            out.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }

        if braced {
            if chars.peek() == Some(&'}') {
                chars.next();
            } else {
                out.push_str("${");
                out.push_str(&name);
                continue;
            }
        }

        if name.is_empty() && !braced {
            out.push('$');
            continue;
        }

        if let Some(value) = env.borrow().get(&name) {
            out.push_str(&value.inspect());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn run(code: &str) -> Object {
        let parser = Parser::new(Lexer::new(code));
        let (program, errors) = parser.parse_program();
        assert!(errors.is_empty(), "parse errors in {:?}: {:?}", code, errors);

        let evaluator = Evaluator::new(Builtins::standard());
        evaluator.eval_program(&program, &Environment::new().into())
    }

    fn error(message: &str) -> Object {
        Object::Error(message.to_string())
    }

    fn numbers(values: &[f64]) -> Object {
        Object::array(values.iter().map(|v| Object::Number(*v)).collect())
    }

    #[test]
    fn test_number_expressions() {
        let cases = [
            ("5", 5.0),
            ("-5", -5.0),
            ("2 + 3 * 4", 14.0),
            ("(2 + 3) * 4", 20.0),
            ("10 / 4", 2.5),
            ("2 ** 3", 8.0),
            ("7 % 3", 1.0),
            ("7.5 % 2", 1.5),
            ("1 <=> 2", -1.0),
            ("2 <=> 2", 0.0),
            ("3 <=> 2", 1.0),
            ("1.5 + 1.5", 3.0),
        ];
        for (code, want) in cases {
            assert_eq!(run(code), Object::Number(want), "{}", code);
        }
    }

    #[test]
    fn test_comparisons() {
        let cases = [
            ("1 < 2", true),
            ("1 > 2", false),
            ("2 <= 2", true),
            ("2 >= 3", false),
            ("1 == 1", true),
            ("1 != 1", false),
            ("1 ~ 1.5", true),
            ("1 ~ 2", false),
            ("-1.5 ~ -1", true),
            ("\"a\" == \"a\"", true),
            ("\"a\" != \"b\"", true),
            ("\"HeLLo\" ~ \"hello\"", true),
            ("\"x\" ~ \"y\"", false),
            ("1 == \"1\"", false),
            ("1 != \"1\"", true),
            ("null == null", true),
            ("null == false", false),
            ("true == true", true),
        ];
        for (code, want) in cases {
            assert_eq!(run(code), Object::Boolean(want), "{}", code);
        }
    }

    #[test]
    fn test_bang_operator() {
        let cases = [
            ("!true", false),
            ("!!true", true),
            ("!5", false),
            ("!0", true),
            ("!\"\"", true),
            ("!\"hi\"", false),
            ("!null", true),
            ("![]", false),
            ("!{}", false),
            ("!\"a\".ok", true),
        ];
        for (code, want) in cases {
            assert_eq!(run(code), Object::Boolean(want), "{}", code);
        }
    }

    #[test]
    fn test_short_circuit_yields_operands() {
        assert_eq!(run("\"\" && 2"), Object::str(""));
        assert_eq!(run("\"\" || 2"), Object::Number(2.0));
        assert_eq!(run("1 && 2"), Object::Number(2.0));
        assert_eq!(run("0 || \"\""), Object::str(""));

        // The right side must not run at all when the left decides.
        assert_eq!(run("null && boom"), Object::Null);
        assert_eq!(run("1 || boom"), Object::Number(1.0));
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(run("\"a\" + \"b\" + \"c\""), Object::str("abc"));
        assert_eq!(
            run("\"a\" - \"b\""),
            error("unknown operator: STRING - STRING")
        );
    }

    #[test]
    fn test_operator_errors() {
        let cases = [
            ("5 + true", "type mismatch: NUMBER + BOOLEAN"),
            ("5 + true; 5", "type mismatch: NUMBER + BOOLEAN"),
            ("\"a\" + 1", "type mismatch: STRING + NUMBER"),
            ("-true", "unknown operator: -BOOLEAN"),
            ("true + false", "unknown operator: BOOLEAN + BOOLEAN"),
            (
                "if true { 5 + true; 99 }",
                "type mismatch: NUMBER + BOOLEAN",
            ),
        ];
        for (code, want) in cases {
            assert_eq!(run(code), error(want), "{}", code);
        }
    }

    #[test]
    fn test_container_equality_is_identity() {
        assert_eq!(run("[1] == [1]"), Object::Boolean(false));
        assert_eq!(run("[1] != [1]"), Object::Boolean(true));
        assert_eq!(run("a = [1]; a == a"), Object::Boolean(true));
        assert_eq!(run("a = [1]; b = a; a == b"), Object::Boolean(true));
        assert_eq!(run("{} == {}"), Object::Boolean(false));
        assert_eq!(run("h = {}; g = h; g == h"), Object::Boolean(true));
    }

    #[test]
    fn test_array_concat() {
        assert_eq!(run("[1, 2] + [3]"), numbers(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(run("1..3"), numbers(&[1.0, 2.0, 3.0]));
        assert_eq!(run("1..1"), numbers(&[1.0]));
        assert_eq!(run("1..0"), numbers(&[]));
        assert_eq!(run("3..1"), numbers(&[]));
        assert_eq!(run("-1..0"), numbers(&[-1.0, 0.0]));
        assert_eq!(run("-1..1"), numbers(&[-1.0, 0.0, 1.0]));
    }

    #[test]
    fn test_if_scenarios() {
        assert_eq!(run("if 1 <= 2 { \"a\" }"), Object::str("a"));
        assert_eq!(run("if false { 1 }"), Object::Null);
        assert_eq!(run("if 0 { 1 } else { 2 }"), Object::Number(2.0));
        assert_eq!(run("if \"\" { 1 } else { 2 }"), Object::Number(2.0));
        assert_eq!(run("if [] { 1 } else { 2 }"), Object::Number(1.0));
        assert_eq!(run("if null { 1 } else { 2 }"), Object::Number(2.0));
        assert_eq!(
            run("x = 3; if x == 1 { \"a\" } else if x == 2 { \"b\" } else if x == 3 { \"c\" } else { \"d\" }"),
            Object::str("c")
        );
    }

    #[test]
    fn test_while() {
        assert_eq!(run("x = 0; while x < 5 { x += 1 }; x"), Object::Number(5.0));
        assert_eq!(run("while false { 1 }"), Object::Null);
        assert_eq!(run("while boom { 1 }"), error("identifier not found: boom"));
        assert_eq!(
            run("seven = f() { while true { return 7 } }; seven()"),
            Object::Number(7.0)
        );
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            run("s = 0; for i = 0; i < 5; i = i + 1 { s += i }; s"),
            Object::Number(10.0)
        );
        // The loop variable is scoped to the loop.
        assert_eq!(
            run("k = 100; for k = 0; k < 3; k = k + 1 {}; k"),
            Object::Number(100.0)
        );
        assert_eq!(
            run("for j = 0; j < 3; j = j + 1 {}; j"),
            error("identifier not found: j")
        );
    }

    #[test]
    fn test_for_in() {
        assert_eq!(
            run("s = 0; for x in [1, 2, 3] { s += x }; s"),
            Object::Number(6.0)
        );
        assert_eq!(
            run("s = \"\"; for i, c in \"abc\" { s += c + str(i) }; s"),
            Object::str("a0b1c2")
        );
        assert_eq!(
            run("s = \"\"; for k, v in {\"b\": 2, \"a\": 1} { s = s + k + str(v) }; s"),
            Object::str("a1b2")
        );
        assert_eq!(run("for x in [] { 1 } else { 99 }"), Object::Number(99.0));
        assert_eq!(run("v = 5; for v in [1] {}; v"), Object::Number(5.0));
        assert_eq!(run("for q in [1] {}; q"), error("identifier not found: q"));
        assert_eq!(
            run("for x in 5 { x }"),
            error("'5' is a NUMBER, not an iterable, cannot be used in for loop")
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            run("identity = f(x) { x }; identity(5)"),
            Object::Number(5.0)
        );
        assert_eq!(
            run("early = f() { return 1; 2 }; early()"),
            Object::Number(1.0)
        );
        assert_eq!(run("f(x) { x * 2 }(3)"), Object::Number(6.0));
        assert_eq!(
            run("adder = f(x) { f(y) { x + y } }; add2 = adder(2); add2(3)"),
            Object::Number(5.0)
        );
        // A return only unwinds to the function it lives in.
        assert_eq!(
            run("outer = f() { inner = f() { return 1 }; inner(); 2 }; outer()"),
            Object::Number(2.0)
        );
    }

    #[test]
    fn test_named_function_recursion() {
        let code = "f fib(n) { if n < 2 { return n }; fib(n - 1) + fib(n - 2) }; fib(10)";
        assert_eq!(run(code), Object::Number(55.0));
    }

    #[test]
    fn test_call_errors() {
        assert_eq!(
            run("add = f(x, y) { x + y }; add(1)"),
            error("wrong number of arguments to add(x, y): got=1, want=2")
        );
        assert_eq!(
            run("f(x) { x }(1, 2)"),
            error("wrong number of arguments to f(x): got=2, want=1")
        );
        assert_eq!(run("5(1)"), error("not a function: NUMBER"));
        assert_eq!(run("len(boom)"), error("identifier not found: boom"));
    }

    #[test]
    fn test_return_statements() {
        assert_eq!(run("return 10; 20"), Object::Number(10.0));
        assert_eq!(run("return;"), Object::Null);
        assert_eq!(
            run("if true { if true { return 3 }; return 10 }"),
            Object::Number(3.0)
        );
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(run("x = 5; x"), Object::Number(5.0));
        assert_eq!(run("boom"), error("identifier not found: boom"));
        assert_eq!(run("len").kind(), Kind::Builtin);
        // A binding shadows the builtin of the same name.
        assert_eq!(run("len = 5; len"), Object::Number(5.0));
    }

    #[test]
    fn test_assignments() {
        assert_eq!(run("x = 5; x = x + 1; x"), Object::Number(6.0));
        assert_eq!(run("x = 5"), Object::Null);
        assert_eq!(
            run("a = [1]; a[3] = 9; a"),
            Object::array(vec![
                Object::Number(1.0),
                Object::Null,
                Object::Null,
                Object::Number(9.0),
            ])
        );
        assert_eq!(run("a = [1]; a[-1] = 2"), error("index out of range: -1"));
        assert_eq!(
            run("a = []; a[\"k\"] = 1"),
            error("index operator not supported: k on ARRAY")
        );
        assert_eq!(run("h = {}; h[\"k\"] = 1; h.k"), Object::Number(1.0));
        assert_eq!(run("h = {}; h[1] = \"one\"; h[1]"), Object::str("one"));
        assert_eq!(run("h = {\"a\": 1}; h.a = 2; h.a"), Object::Number(2.0));
        assert_eq!(run("h = {}; h.b = 3; h[\"b\"]"), Object::Number(3.0));
        assert_eq!(
            run("s = \"x\"; s.a = 1"),
            error("can only assign to hash property, got STRING")
        );
        assert_eq!(
            run("n = 1; n[0] = 1"),
            error("index assignment not supported: NUMBER")
        );
    }

    #[test]
    fn test_assignment_reaches_captured_scope() {
        assert_eq!(
            run("x = 1; bump = f() { x = 2 }; bump(); x"),
            Object::Number(2.0)
        );
        // A parameter is local; writing it leaves the outer name alone.
        assert_eq!(
            run("x = 1; id = f(x) { x = 99 }; id(5); x"),
            Object::Number(1.0)
        );
    }

    #[test]
    fn test_destructuring() {
        assert_eq!(run("[a, b] = [1, 2]; a + b"), Object::Number(3.0));
        assert_eq!(
            run("[a, b, c] = [1]; [a, b, c]"),
            Object::array(vec![Object::Number(1.0), Object::Null, Object::Null])
        );
        assert_eq!(
            run("[x, y] = {\"x\": 1, \"z\": 2}; [x, y]"),
            Object::array(vec![Object::Number(1.0), Object::Null])
        );
        assert_eq!(run("[only] = [7]; only"), Object::Number(7.0));
        assert_eq!(
            run("[a] = 5"),
            error("can only destructure arrays and hashes, got NUMBER")
        );
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(run("x = 1; x += 2"), Object::Number(3.0));
        assert_eq!(run("x = 10; x -= 3; x"), Object::Number(7.0));
        assert_eq!(run("x = 2; x *= 3; x"), Object::Number(6.0));
        assert_eq!(run("x = 9; x /= 3; x"), Object::Number(3.0));
        assert_eq!(run("x = 2; x **= 3; x"), Object::Number(8.0));
        assert_eq!(run("x = 7; x %= 4; x"), Object::Number(3.0));
        assert_eq!(run("s = \"a\"; s += \"b\"; s"), Object::str("ab"));
        assert_eq!(run("a = [1, 2]; a[0] += 10; a[0]"), Object::Number(11.0));
        assert_eq!(run("h = {\"n\": 1}; h.n += 1; h.n"), Object::Number(2.0));
        assert_eq!(
            run("x = 1; x += \"a\""),
            error("type mismatch: NUMBER + STRING")
        );
        assert_eq!(run("z += 1"), error("identifier not found: z"));
        assert_eq!(run("1 += 2"), error("cannot assign to 1"));
    }

    #[test]
    fn test_method_calls() {
        assert_eq!(
            run("\"a,b,c\".split(\",\")"),
            Object::array(vec![Object::str("a"), Object::str("b"), Object::str("c")])
        );
        assert_eq!(run("\"  x  \" | trim()"), Object::str("x"));
        assert_eq!(run("\"a,b\".split(\",\").len()"), Object::Number(2.0));
        assert_eq!(run("[1, 2, 3].contains(2)"), Object::Boolean(true));
        assert_eq!(
            run("h = {\"double\": f(x) { x * 2 }}; h.double(5)"),
            Object::Number(10.0)
        );
        assert_eq!(run("5.foo()"), error("NUMBER does not have method 'foo()'"));
        assert_eq!(
            run("{}.split(\",\")"),
            error("cannot call method 'split()' on 'HASH'")
        );
    }

    #[test]
    fn test_optional_method_calls() {
        assert_eq!(run("null?.anything()"), Object::Null);
        assert_eq!(run("5?.foo()"), Object::Null);
        // On a null receiver the arguments never run.
        assert_eq!(run("null?.foo(boom)"), Object::Null);
    }

    #[test]
    fn test_properties() {
        assert_eq!(run("{\"a\": 1}.a"), Object::Number(1.0));
        assert_eq!(run("{\"a\": 1}.b"), Object::Null);
        assert_eq!(run("h = {\"a\": {\"b\": 2}}; h.a.b"), Object::Number(2.0));
        assert_eq!(run("null?.x"), Object::Null);
        assert_eq!(run("null.x"), error("invalid property 'x' on type NULL"));
        assert_eq!(run("5.x"), error("invalid property 'x' on type NUMBER"));
        // Plain strings answer .ok with false.
        assert_eq!(run("\"s\".ok"), Object::Boolean(false));
    }

    #[test]
    fn test_index() {
        assert_eq!(run("[1, 2, 3][0]"), Object::Number(1.0));
        assert_eq!(run("[1, 2, 3][2]"), Object::Number(3.0));
        assert_eq!(run("[1, 2, 3][3]"), Object::Null);
        assert_eq!(run("[1, 2][-1]"), Object::Null);
        assert_eq!(run("a = [1, 2]; i = 1; a[i]"), Object::Number(2.0));
        assert_eq!(run("\"hello\"[1]"), Object::str("e"));
        assert_eq!(run("\"hi\"[5]"), Object::Null);
        assert_eq!(run("{\"k\": 1}[\"k\"]"), Object::Number(1.0));
        assert_eq!(run("{\"k\": 1}[\"nope\"]"), Object::Null);
        assert_eq!(run("{}[[1]]"), error("unusable as hash key: ARRAY"));
        assert_eq!(
            run("{1: 1}[f(x) { x }]"),
            error("unusable as hash key: FUNCTION")
        );
        assert_eq!(
            run("5[0]"),
            error("index operator not supported: 0 on NUMBER")
        );
        assert_eq!(
            run("[1][\"a\"]"),
            error("index operator not supported: a on ARRAY")
        );
    }

    #[test]
    fn test_index_ranges() {
        assert_eq!(run("[1, 2, 3, 4][1:3]"), numbers(&[2.0, 3.0]));
        assert_eq!(run("[1, 2, 3][:2]"), numbers(&[1.0, 2.0]));
        assert_eq!(run("[1, 2, 3][1:]"), numbers(&[2.0, 3.0]));
        assert_eq!(run("[1, 2, 3][5:]"), numbers(&[]));
        assert_eq!(run("[1, 2, 3][0:-1]"), numbers(&[1.0, 2.0]));
        assert_eq!(run("\"hello\"[0:-1]"), Object::str("hell"));
        assert_eq!(run("\"hello\"[1:3]"), Object::str("el"));
        assert_eq!(
            run("[1, 2][0:\"x\"]"),
            error("index ranges can only be numerical: got \"x\" (type STRING)")
        );
    }

    #[test]
    fn test_hash_literals() {
        assert_eq!(run("{\"a\": 1, 2: \"two\", true: 3}[2]"), Object::str("two"));
        assert_eq!(run("{\"a\": 1}[\"a\"]"), Object::Number(1.0));
        assert_eq!(run("{true: 3}[true]"), Object::Number(3.0));
        // Keys are expressions; an identifier key evaluates first.
        assert_eq!(run("k = \"x\"; h = {k: 1}; h.x"), Object::Number(1.0));
        assert_eq!(run("{[1]: 2}"), error("unusable as hash key: ARRAY"));
        assert_eq!(run("{\"k\": boom}"), error("identifier not found: boom"));
    }

    #[test]
    fn test_decorators() {
        let code = "
            double = f(fn) { f(x) { fn(x) * 2 } }
            @double
            f add1(x) { x + 1 }
            add1(5)
        ";
        assert_eq!(run(code), Object::Number(12.0));

        let stacked = "
            double = f(fn) { f(x) { fn(x) * 2 } }
            @double
            @double
            f add1(x) { x + 1 }
            add1(1)
        ";
        assert_eq!(run(stacked), Object::Number(8.0));

        let factory = "
            times = f(n) { f(fn) { f(x) { fn(x) * n } } }
            @times(3)
            f val(x) { x }
            val(2)
        ";
        assert_eq!(run(factory), Object::Number(6.0));
    }

    #[test]
    fn test_decorator_errors() {
        assert_eq!(
            run("@5 f x() { 1 }"),
            error("decorator must be a function, got NUMBER")
        );
        assert_eq!(
            run("id = f(fn) { fn }; @id f(x) { x }"),
            error(
                "error while processing decorator: unable to find the name of the function you're trying to decorate"
            )
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(run("$(echo hello)"), Object::str("hello"));
        // A command runs to the end of the line, so .ok needs a binding.
        assert_eq!(run("r = $(echo hi)\nr.ok"), Object::Boolean(true));
        assert_eq!(run("r = $(false)\nr.ok"), Object::Boolean(false));
        assert_eq!(run("$(echo oops >&2; exit 1)"), Object::str("oops"));
        assert_eq!(
            run("name = \"world\"; $(echo hello $name)"),
            Object::str("hello world")
        );
        assert_eq!(run("x = \"A\"; $(echo ${x}B)"), Object::str("AB"));
        assert_eq!(run("n = 42; $(echo $n)"), Object::str("42"));
    }

    #[test]
    fn test_interpolation() {
        let env: EnvironmentRef = Environment::new().into();
        env.borrow_mut().define("string", Object::str("test"));

        let cases = [
            ("string $string string", "string test string"),
            ("${string}", "test"),
            (r"\$string", "$string"),
            (r"\${string}", "${string}"),
            ("_$string", "_test"),
            (r"string$string\string", r"stringtest\string"),
            ("$string_", ""),
            (r"xy\z", r"xy\z"),
            ("${string}_", "test_"),
            ("${string x", "${string x"),
        ];
        for (input, want) in cases {
            assert_eq!(interpolate(input, &env), want, "{:?}", input);
        }
    }

    #[test]
    fn test_program_results() {
        assert_eq!(run(""), Object::Null);
        assert_eq!(run("5; 6"), Object::Number(6.0));
    }
}
