use std::process::ExitCode;

fn main() -> ExitCode {
    numamask_cli::run()
}
