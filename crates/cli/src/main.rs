use std::process::ExitCode;

fn main() -> ExitCode {
    printguard_cli::run()
}
