use std::io;
use std::process::ExitCode;

use exact_real::repl::Repl;

fn main() -> ExitCode {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut repl = Repl::new();
    match repl.run(stdin.lock(), &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("i/o error: {error}");
            ExitCode::FAILURE
        }
    }
}
