use std::process::ExitCode;

fn main() -> ExitCode {
    matchslot_cli::run()
}
