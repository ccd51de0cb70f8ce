use clap::Parser;
use env_logger::Env;
use log::error;

use fee_proxy::cli::Cli;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(err) = fee_proxy::app::run(Cli::parse()).await {
        error!("{err}");
        std::process::exit(1);
    }
}
