mod config;
mod error;
mod walkthrough;

use std::fs::File;

use simplelog::{Config, WriteLogger};

use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::walkthrough::Walkthrough;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = DemoConfig::from_env();

    if let Err(e) = run(config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: DemoConfig) -> Result<(), DemoError> {
    let log_file = File::create(&config.log_file)?;
    WriteLogger::init(config.log_level, Config::default(), log_file)?;
    log::info!("starting walkthrough with {:?}", config);

    let mut walkthrough = Walkthrough::new(&config)?;
    walkthrough.run().await
}
