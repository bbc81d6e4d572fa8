use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{self, Block};
use crate::builtins::Builtin;
use crate::env::EnvironmentRef;

/// The closed set of runtime kinds. Every dispatch site matches on this
/// exhaustively, so adding a kind forces a decision everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Number,
    Str,
    Array,
    Hash,
    Function,
    Builtin,
    Error,
    Return,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "NULL",
            Self::Boolean => "BOOLEAN",
            Self::Number => "NUMBER",
            Self::Str => "STRING",
            Self::Array => "ARRAY",
            Self::Hash => "HASH",
            Self::Function => "FUNCTION",
            Self::Builtin => "BUILTIN",
            Self::Error => "ERROR",
            Self::Return => "RETURN_VALUE",
        })
    }
}

/// A string value. Strings born from external commands additionally
/// carry whether the command exited cleanly, surfaced as `.ok`.
#[derive(Clone, Debug)]
pub struct ConchString {
    pub value: String,
    pub ok: Option<bool>,
}

impl PartialEq for ConchString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Key into a hash: the key's kind plus its printed form. Ordering is
/// kind first, printed form second, which fixes iteration order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey {
    pub kind: Kind,
    pub repr: String,
}

impl HashKey {
    pub fn str(value: impl Into<String>) -> Self {
        Self {
            kind: Kind::Str,
            repr: value.into(),
        }
    }
}

/// The original key object is kept next to the value so iteration and
/// printing can use it as written.
#[derive(Clone, Debug, PartialEq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

pub type HashPairs = BTreeMap<HashKey, HashPair>;

pub struct Function {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Block,
    pub env: EnvironmentRef,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f")?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?;
        }
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            f.write_str(param)?;
        }
        write!(f, ") ")?;
        ast::fmt_block(f, &self.body)
    }
}

// The captured environment links back to values holding this function,
// so the debug form stays shallow.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub enum Object {
    Null,
    Boolean(bool),
    Number(f64),
    Str(ConchString),
    Array(Rc<RefCell<Vec<Object>>>),
    Hash(Rc<RefCell<HashPairs>>),
    Function(Rc<Function>),
    Builtin(Builtin),
    Error(String),
    Return(Box<Object>),
}

impl Object {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(ConchString {
            value: value.into(),
            ok: None,
        })
    }

    pub fn command_result(value: impl Into<String>, ok: bool) -> Self {
        Self::Str(ConchString {
            value: value.into(),
            ok: Some(ok),
        })
    }

    pub fn array(elements: Vec<Object>) -> Self {
        Self::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn hash(pairs: HashPairs) -> Self {
        Self::Hash(Rc::new(RefCell::new(pairs)))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::Null => Kind::Null,
            Self::Boolean(_) => Kind::Boolean,
            Self::Number(_) => Kind::Number,
            Self::Str(_) => Kind::Str,
            Self::Array(_) => Kind::Array,
            Self::Hash(_) => Kind::Hash,
            Self::Function(_) => Kind::Function,
            Self::Builtin(_) => Kind::Builtin,
            Self::Error(_) => Kind::Error,
            Self::Return(_) => Kind::Return,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The canonical print form: what `echo` and the REPL show.
    pub fn inspect(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Boolean(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::Str(string) => string.value.clone(),
            Self::Array(elements) => {
                let elements: Vec<String> =
                    elements.borrow().iter().map(|e| e.json()).collect();
                format!("[{}]", elements.join(", "))
            }
            Self::Hash(pairs) => {
                let pairs: Vec<String> = pairs
                    .borrow()
                    .values()
                    .map(|pair| format!("{}: {}", pair.key.json(), pair.value.json()))
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
            Self::Function(function) => function.to_string(),
            Self::Builtin(_) => "builtin function".to_string(),
            Self::Error(message) => format!("ERROR: {message}"),
            Self::Return(value) => value.inspect(),
        }
    }

    /// Like inspect, except strings keep their quotes; containers embed
    /// their elements in this form.
    pub fn json(&self) -> String {
        match self {
            Self::Str(string) => format!("\"{}\"", string.value),
            _ => self.inspect(),
        }
    }

    /// Null, false, zero and the empty string are falsy; every other
    /// value (including empty arrays and hashes) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(value) => *value,
            Self::Number(value) => *value != 0.0,
            Self::Str(string) => !string.value.is_empty(),
            _ => true,
        }
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Self::Boolean(_) | Self::Number(_) | Self::Str(_) => Some(HashKey {
                kind: self.kind(),
                repr: self.inspect(),
            }),
            _ => None,
        }
    }

    /// The iteration capability: arrays yield (index, element), strings
    /// (index, one-character string), hashes (key, value) in key order.
    /// Everything else is not iterable.
    pub fn iter_pairs(&self) -> Option<Vec<(Object, Object)>> {
        match self {
            Self::Array(elements) => Some(
                elements
                    .borrow()
                    .iter()
                    .enumerate()
                    .map(|(i, element)| (Self::Number(i as f64), element.clone()))
                    .collect(),
            ),
            Self::Str(string) => Some(
                string
                    .value
                    .chars()
                    .enumerate()
                    .map(|(i, c)| (Self::Number(i as f64), Self::str(c.to_string())))
                    .collect(),
            ),
            Self::Hash(pairs) => Some(
                pairs
                    .borrow()
                    .values()
                    .map(|pair| (pair.key.clone(), pair.value.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Hash(a), Self::Hash(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Return(a), Self::Return(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_inspect() {
        assert_eq!(Object::Number(5.0).inspect(), "5");
        assert_eq!(Object::Number(5.5).inspect(), "5.5");
        assert_eq!(Object::Number(-3.0).inspect(), "-3");
        assert_eq!(Object::Number(1.0 / 3.0).inspect(), "0.3333333333333333");
    }

    #[test]
    fn test_container_inspect() {
        let array = Object::array(vec![Object::Number(1.0), Object::str("a")]);
        assert_eq!(array.inspect(), "[1, \"a\"]");

        let mut pairs = HashPairs::new();
        pairs.insert(
            HashKey::str("b"),
            HashPair {
                key: Object::str("b"),
                value: Object::Number(2.0),
            },
        );
        pairs.insert(
            HashKey::str("a"),
            HashPair {
                key: Object::str("a"),
                value: Object::Number(1.0),
            },
        );
        assert_eq!(Object::hash(pairs).inspect(), "{\"a\": 1, \"b\": 2}");
    }

    #[test]
    fn test_error_inspect() {
        let error = Object::Error("identifier not found: foo".to_string());
        assert_eq!(error.inspect(), "ERROR: identifier not found: foo");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Object::Null.is_truthy());
        assert!(!Object::Boolean(false).is_truthy());
        assert!(!Object::Number(0.0).is_truthy());
        assert!(!Object::str("").is_truthy());

        assert!(Object::Boolean(true).is_truthy());
        assert!(Object::Number(-1.0).is_truthy());
        assert!(Object::str("x").is_truthy());
        assert!(Object::array(vec![]).is_truthy());
        assert!(Object::hash(HashPairs::new()).is_truthy());
    }

    #[test]
    fn test_hash_keys() {
        assert_eq!(
            Object::str("a").hash_key(),
            Some(HashKey {
                kind: Kind::Str,
                repr: "a".to_string()
            })
        );
        assert_eq!(
            Object::Number(1.0).hash_key(),
            Some(HashKey {
                kind: Kind::Number,
                repr: "1".to_string()
            })
        );
        assert_eq!(Object::array(vec![]).hash_key(), None);
        assert_eq!(Object::Null.hash_key(), None);
    }

    #[test]
    fn test_string_equality_ignores_ok() {
        assert_eq!(Object::command_result("hi", true), Object::str("hi"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::Str.to_string(), "STRING");
        assert_eq!(Kind::Return.to_string(), "RETURN_VALUE");
        assert_eq!(Object::Null.kind().to_string(), "NULL");
    }
}
