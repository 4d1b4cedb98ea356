use clap::Parser;
use spectral_ingest::IngestError;
use spectral_ingest::cli::{args::Args, commands};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Usage errors print the message and help, then exit without processing
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            if !error.use_stderr() {
                // --help / --version
                let _ = error.print();
                process::exit(0);
            }
            let _ = error.print();
            eprintln!();
            let _ = <Args as clap::CommandFactory>::command().print_help();
            process::exit(2);
        }
    };

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let cancellation_token = CancellationToken::new();

        // The pipeline is sequential and blocking; it checks the token between measurements
        let token = cancellation_token.clone();
        let mut run = tokio::task::spawn_blocking(move || commands::run(args, token));

        let shutdown_signal = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler available; never fire
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            joined = &mut run => match joined {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("processing task failed: {}", e)),
            },
            _ = shutdown_signal => {
                cancellation_token.cancel();
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(IngestError::interrupted("interrupted by user").into())
            }
        }
    });

    match result {
        Ok(_summary) => {
            // Results and the summary have already been written to stdout
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
