use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    simba_cli::run()
}
