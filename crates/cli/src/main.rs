use std::process::ExitCode;

fn main() -> ExitCode {
    adpulse_cli::run()
}
