use std::process::ExitCode;

fn main() -> ExitCode {
    architectum::cli::run()
}
