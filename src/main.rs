use clap::Parser;
use imgen::config::setup_logging;
use tracing::{error, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = imgen::cli::CliOptions::parse();

    if let Err(err) = setup_logging(cli.debug) {
        eprintln!("{}", err);
        return;
    }

    if cli.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set, every generation request will fail until it is");
    }

    if let Err(err) = imgen::web::setup_server(&cli).await {
        error!("Application error: {}", err);
    }
}
