use std::process::ExitCode;

fn main() -> ExitCode {
    sara_cli::run()
}
