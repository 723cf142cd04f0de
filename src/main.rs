use std::process::ExitCode;

fn main() -> ExitCode {
    match detkit::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
