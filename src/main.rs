use std::process::ExitCode;

fn main() -> ExitCode {
    suiterun::cli::run()
}
