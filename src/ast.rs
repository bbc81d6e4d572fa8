use std::fmt;

/// A parsed script: the ordered top-level statements.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

pub type Block = Vec<Stmt>;

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// `x = 1;`, `a[0] = 1;` or `h.key = 1;`.
    Assign { target: Expr, value: Expr },
    /// `[a, b] = pairs;` binding names by position (or hash key).
    Destructure { names: Vec<String>, value: Expr },
    Return(Option<Expr>),
    Expression(Expr),
}

/// One `(condition, block)` arm of an `if`/`else if`/`else` chain.
/// A trailing bare `else` is a scenario whose condition is the literal
/// `true`, so a chain is always one ordered list tested first-match.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    pub condition: Expr,
    pub consequence: Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfixOp {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Power,
    Modulo,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Cmp,
    Eq,
    NotEq,
    Tilde,
    Range,
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Identifier(String),
    Number(f64),
    Str(String),
    Boolean(bool),
    Null,
    Command(String),
    Array(Vec<Expr>),
    /// Pairs in source order; keying happens at evaluation.
    Hash(Vec<(Expr, Expr)>),
    Prefix {
        op: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `x += 1` and friends; `op` is the base operator.
    CompoundAssign {
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        scenarios: Vec<Scenario>,
    },
    While {
        condition: Box<Expr>,
        block: Block,
    },
    /// C-style `for x = 0; x < 10; x = x + 1 { ... }`; starter and closer
    /// are assignment statements on `ident`.
    For {
        ident: String,
        starter: Box<Stmt>,
        condition: Box<Expr>,
        closer: Box<Stmt>,
        block: Block,
    },
    /// `for [k,] v in iterable { ... } [else { ... }]`; the alternative
    /// runs when the iterable is empty.
    ForIn {
        key: Option<String>,
        value: String,
        iterable: Box<Expr>,
        block: Block,
        alternative: Option<Block>,
    },
    Function {
        name: Option<String>,
        params: Vec<String>,
        body: Block,
    },
    /// `@expr` followed by a named function literal.
    Decorator {
        expression: Box<Expr>,
        function: Box<Expr>,
    },
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `obj.name(args)`, `obj?.name(args)` or the pipe form
    /// `obj | name(args)`.
    Method {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        optional: bool,
    },
    /// Single `x[i]` or range `x[a:b]` (either side of the range may be
    /// omitted).
    Index {
        left: Box<Expr>,
        index: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        is_range: bool,
    },
    Property {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
}

impl Expr {
    pub fn prefix(op: PrefixOp, right: Expr) -> Self {
        Self::Prefix {
            op,
            right: Box::new(right),
        }
    }

    pub fn infix(op: InfixOp, left: Expr, right: Expr) -> Self {
        Self::Infix {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { target, value } => write!(f, "{target} = {value};"),
            Self::Destructure { names, value } => {
                write!(f, "[{}] = {value};", names.join(", "))
            }
            Self::Return(None) => write!(f, "return;"),
            Self::Return(Some(value)) => write!(f, "return {value};"),
            Self::Expression(expression) => write!(f, "{expression}"),
        }
    }
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bang => "!",
            Self::Minus => "-",
        })
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Power => "**",
            Self::Modulo => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Cmp => "<=>",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Tilde => "~",
            Self::Range => "..",
            Self::And => "&&",
            Self::Or => "||",
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => f.write_str(name),
            Self::Number(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "\"{}\"", escape(value)),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Null => f.write_str("null"),
            Self::Command(value) => write!(f, "$({value})"),
            Self::Array(elements) => {
                write!(f, "[")?;
                fmt_list(f, elements)?;
                write!(f, "]")
            }
            Self::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Prefix { op, right } => write!(f, "({op}{right})"),
            Self::Infix { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::CompoundAssign { op, left, right } => write!(f, "({left} {op}= {right})"),
            Self::If { scenarios } => {
                for (i, scenario) in scenarios.iter().enumerate() {
                    let last = i == scenarios.len() - 1;
                    if i == 0 {
                        write!(f, "if {} ", scenario.condition)?;
                    } else if last && scenario.condition == Expr::Boolean(true) {
                        write!(f, " else ")?;
                    } else {
                        write!(f, " else if {} ", scenario.condition)?;
                    }
                    fmt_block(f, &scenario.consequence)?;
                }
                Ok(())
            }
            Self::While { condition, block } => {
                write!(f, "while {condition} ")?;
                fmt_block(f, block)
            }
            Self::For {
                starter,
                condition,
                closer,
                block,
                ..
            } => {
                write!(f, "for {starter} {condition}; {closer} ")?;
                fmt_block(f, block)
            }
            Self::ForIn {
                key,
                value,
                iterable,
                block,
                alternative,
            } => {
                write!(f, "for ")?;
                if let Some(key) = key {
                    write!(f, "{key}, ")?;
                }
                write!(f, "{value} in {iterable} ")?;
                fmt_block(f, block)?;
                if let Some(alternative) = alternative {
                    write!(f, " else ")?;
                    fmt_block(f, alternative)?;
                }
                Ok(())
            }
            Self::Function { name, params, body } => {
                write!(f, "f")?;
                if let Some(name) = name {
                    write!(f, " {name}")?;
                }
                write!(f, "(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    f.write_str(param)?;
                }
                write!(f, ") ")?;
                fmt_block(f, body)
            }
            Self::Decorator {
                expression,
                function,
            } => write!(f, "@{expression} {function}"),
            Self::Call { function, args } => {
                write!(f, "{function}(")?;
                fmt_list(f, args)?;
                write!(f, ")")
            }
            Self::Method {
                object,
                method,
                args,
                optional,
            } => {
                let dot = if *optional { "?." } else { "." };
                write!(f, "{object}{dot}{method}(")?;
                fmt_list(f, args)?;
                write!(f, ")")
            }
            Self::Index {
                left,
                index,
                end,
                is_range,
            } => {
                write!(f, "({left}[")?;
                if let Some(index) = index {
                    write!(f, "{index}")?;
                }
                if *is_range {
                    write!(f, ":")?;
                    if let Some(end) = end {
                        write!(f, "{end}")?;
                    }
                }
                write!(f, "])")
            }
            Self::Property {
                object,
                property,
                optional,
            } => {
                let dot = if *optional { "?." } else { "." };
                write!(f, "({object}{dot}{property})")
            }
        }
    }
}

fn fmt_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

pub(crate) fn fmt_block(f: &mut fmt::Formatter<'_>, block: &Block) -> fmt::Result {
    if block.is_empty() {
        return f.write_str("{ }");
    }
    f.write_str("{ ")?;
    for (i, statement) in block.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{statement}")?;
    }
    f.write_str(" }")
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
