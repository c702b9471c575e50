use std::process::ExitCode;

fn main() -> ExitCode {
    labprice_cli::run()
}
