// src/main.rs

use saltdag::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("saltdag error: {err:?}");
            std::process::exit(1);
        }
    }
}

/// Returns whether the run succeeded.
async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    match run(args).await? {
        Some(report) => {
            println!("{report}");
            Ok(report.success())
        }
        None => Ok(true),
    }
}
