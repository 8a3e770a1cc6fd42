//! dbot CLI: runs the demo order bot. Config from env (`.env` is loaded first) and CLI flags.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dbot_cli::{load_config, order_registry, Cli, Commands};
use dbot_core::init_tracing;
use dbot_telegram::{start_polling, TelegramApi};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            token,
            ignore_current_batch,
            timeout,
        } => {
            let config = load_config(token, ignore_current_batch, timeout)?;
            init_tracing(config.log_file.as_deref())?;

            let api = TelegramApi::new(&config.bot_token, &config.telegram_api_url);
            let registry = order_registry(Arc::new(api.clone()))?;
            start_polling(&config, api, registry).await
        }
    }
}
