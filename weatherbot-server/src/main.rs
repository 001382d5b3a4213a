//! Binary crate for the `weatherbot` server.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - Serving the chat pipeline over HTTP

use clap::Parser;

mod cli;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` in the working directory, if any; real env vars win
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}

#[cfg(test)]
mod tests {
    use weatherbot_core::Config;

    #[test]
    fn dotenv_values_reach_config_overrides() {
        let dir = std::env::temp_dir().join(format!("weatherbot-dotenv-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env");
        std::fs::write(&path, "WEATHERBOT_BIND=127.0.0.1:9123\n").unwrap();

        dotenvy::from_path(&path).unwrap();
        let config = Config::default().with_env_overrides();

        assert_eq!(config.server.bind, "127.0.0.1:9123");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
