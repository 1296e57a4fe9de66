// src/main.rs

use std::process::ExitCode;

use tfapply::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("tfapply: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Phase errors already carry Terraform's stderr; print it as-is.
            eprintln!("tfapply error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
