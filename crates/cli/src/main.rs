use std::process::ExitCode;

fn main() -> ExitCode {
    productmaster_cli::run()
}
