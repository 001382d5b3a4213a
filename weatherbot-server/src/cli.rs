use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use weatherbot_core::{ChatRequest, Config, WeatherChat};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherbot", version, about = "Weather chatbot server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve {
        /// Address to listen on, e.g. "127.0.0.1:8000". Overrides config and WEATHERBOT_BIND.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Store the completion API key in the config file.
    Configure,

    /// Answer a single message and exit.
    Ask {
        /// The message, e.g. "What's the temperature in Delhi?"
        message: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { bind } => {
                let config = Config::load()?.with_env_overrides();
                let addr = bind.unwrap_or_else(|| config.server.bind.clone());
                let chat = WeatherChat::from_config(&config)?;

                server::serve(chat, &addr).await?;
            }
            Command::Configure => configure()?,
            Command::Ask { message } => {
                let config = Config::load()?.with_env_overrides();
                let chat = WeatherChat::from_config(&config)?;

                let reply = chat.respond(&ChatRequest { message }).await;
                println!("{}", reply.response);
            }
        }

        Ok(())
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("API key for the completion service:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Sent as a bearer token; OPENAI_API_KEY overrides it at runtime")
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }
    config.set_api_key(api_key);

    config.geocoding.enabled =
        Confirm::new("Look up place names when the model gives no coordinates?")
            .with_default(config.geocoding.enabled)
            .prompt()
            .context("Failed to read geocoding choice")?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_with_bind() {
        let cli = Cli::try_parse_from(["weatherbot", "serve", "--bind", "127.0.0.1:9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Serve { bind: Some(ref b) } if b == "127.0.0.1:9000"
        ));
    }

    #[test]
    fn parses_ask_message() {
        let cli = Cli::try_parse_from(["weatherbot", "ask", "Is it raining in Oslo?"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Ask { ref message } if message == "Is it raining in Oslo?"
        ));
    }
}
