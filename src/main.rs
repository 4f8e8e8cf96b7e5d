use std::process::ExitCode;

// Command-line arguments are accepted and ignored.
fn main() -> ExitCode {
    match maxalloc::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
