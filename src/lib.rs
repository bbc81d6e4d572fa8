pub mod ast;
pub mod error;
pub mod token;

mod builtins;
mod env;
mod eval;
mod lexer;
mod object;
mod parser;

use error::ConchErrors;

pub use builtins::{Builtin, Builtins};
pub use env::{Environment, EnvironmentRef};
pub use eval::Evaluator;
pub use lexer::Lexer;
pub use object::{Kind, Object};
pub use parser::Parser;

/// Parses and evaluates `code` in the given environment.
///
/// Syntax errors come back as a report pointing into the source.
/// Runtime failures are part of the language, so they land in the Ok
/// branch as an `Object::Error`.
pub fn run(code: &str, evaluator: &Evaluator, env: &EnvironmentRef) -> Result<Object, ConchErrors> {
    let parser = Parser::new(Lexer::new(code));
    let (program, errors) = parser.parse_program();

    if !errors.is_empty() {
        return Err(ConchErrors {
            src: code.to_string(),
            nested: errors.into_iter().map(Into::into).collect(),
        });
    }

    Ok(evaluator.eval_program(&program, env))
}

/// One-shot run with the standard builtins and a fresh environment.
pub fn run_new(code: &str) -> Result<Object, ConchErrors> {
    let evaluator = Evaluator::new(Builtins::standard());
    let env = EnvironmentRef::from(Environment::new());
    run(code, &evaluator, &env)
}
