pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::http_client::{HttpClientFactory, HttpClientService, TransportDefaults};
use crate::services::clients::AdminApiClient;
use config::CliSession;

#[derive(Parser)]
#[command(name = "admin")]
#[command(about = "Admin CLI - Command-line client for the Admin API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Server base URL (defaults to the saved server)")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Login, logout and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "User administration")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UsersCommands,
    },

    #[command(about = "Check server health")]
    Health,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Everything a command needs: where the server is, who we are, and how
/// to print
pub struct CliContext {
    pub output: OutputFormat,
    pub server: String,
    pub session: CliSession,
    factory: HttpClientFactory,
}

impl CliContext {
    pub fn new(output: OutputFormat, server_flag: Option<&str>, session: CliSession) -> Self {
        let transport = Arc::new(HttpClientService::new(TransportDefaults::default()));
        Self {
            output,
            server: session.server_url(server_flag),
            session,
            factory: HttpClientFactory::new(transport),
        }
    }

    /// Client carrying the saved token, if any
    pub fn client(&self) -> anyhow::Result<AdminApiClient> {
        Ok(AdminApiClient::new(&self.factory, &self.server)?.with_token(self.session.token.clone()))
    }

    /// Client for commands that make no sense without a login
    pub fn authenticated_client(&self) -> anyhow::Result<AdminApiClient> {
        if self.session.token.is_none() {
            anyhow::bail!("Not logged in. Run 'admin auth login <email> --password <password>' first");
        }
        self.client()
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let session = config::load_session()?;
    let ctx = CliContext::new(output_format, cli.server.as_deref(), session);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, ctx).await,
        Commands::Users { cmd } => commands::users::handle(cmd, ctx).await,
        Commands::Health => commands::health::handle(ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_commands_parse() {
        let cli = Cli::try_parse_from(["admin", "--json", "users", "list", "--page", "2"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Users {
                cmd: commands::users::UsersCommands::List { page: Some(2), limit: None }
            }
        ));
    }

    #[test]
    fn login_requires_password() {
        assert!(Cli::try_parse_from(["admin", "auth", "login", "root@example.com"]).is_err());
    }

    #[test]
    fn commands_without_token_are_refused() {
        let ctx = CliContext::new(OutputFormat::Text, Some("http://127.0.0.1:1"), CliSession::default());
        assert!(ctx.client().is_ok());
        assert!(ctx.authenticated_client().is_err());
    }
}
