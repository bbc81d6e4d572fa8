use std::path::Path;

use reedline::{DefaultPrompt, Reedline, Signal};

use conch::error::{ConchError, ConchErrors, RuntimeError};
use conch::{Builtins, Environment, EnvironmentRef, Evaluator, Object};

type AppResult = Result<(), std::io::Error>;

fn main() -> AppResult {
    let args = std::env::args_os().collect::<Vec<_>>();

    match args.len() {
        1 => run_repl()?,
        2 => run_file(&args[1])?,
        _ => {
            println!("Usage: conch [script]");
            std::process::exit(42);
        }
    }

    Ok(())
}

fn run_file(file: impl AsRef<Path>) -> AppResult {
    let code = std::fs::read_to_string(file)?;

    let evaluator = Evaluator::new(Builtins::standard());
    let env = EnvironmentRef::from(Environment::new());

    match conch::run(&code, &evaluator, &env) {
        Err(conch_errors) => {
            eprintln!("{:?}", miette::Report::new(conch_errors));
            std::process::exit(99);
        }
        Ok(Object::Error(message)) => {
            let report = ConchErrors {
                src: code,
                nested: vec![ConchError::from(RuntimeError::new(message))],
            };
            eprintln!("{:?}", miette::Report::new(report));
            std::process::exit(99);
        }
        Ok(_) => {}
    }

    Ok(())
}

/// Reads and runs lines against one long-lived environment, so
/// bindings carry over from line to line.
fn run_repl() -> AppResult {
    let evaluator = Evaluator::new(Builtins::standard());
    let env = EnvironmentRef::from(Environment::new());

    let mut line_editor = Reedline::create();
    let prompt = DefaultPrompt::default();

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(line) => {
                if line.trim() == "quit" {
                    break;
                }

                match conch::run(&line, &evaluator, &env) {
                    Ok(Object::Null) => {}
                    Ok(result) => println!("{}", result.inspect()),
                    Err(conch_errors) => {
                        println!("{:?}", miette::Report::new(conch_errors))
                    }
                }
            }
            Signal::CtrlC | Signal::CtrlD => break,
        }
    }

    Ok(())
}
