use anyhow::Result;
use clap::Parser;
use remote_run::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    match cli::dispatch(args).await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(1);
        }
    }
}
