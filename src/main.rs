use std::process::ExitCode;

use clap::Parser;
use smtp_tls_test::{cli::Cli, commands, logger};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logger::init(cli.global.verbose);

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
