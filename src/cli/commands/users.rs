use clap::Subcommand;

use crate::cli::utils::{output_success, output_value};
use crate::cli::CliContext;

#[derive(Subcommand)]
pub enum UsersCommands {
    #[command(about = "List users a page at a time")]
    List {
        #[arg(long, help = "Page number (from 1)")]
        page: Option<u32>,
        #[arg(long, help = "Page size (1-100)")]
        limit: Option<u32>,
    },

    #[command(about = "Show one user")]
    Get {
        #[arg(help = "User id")]
        id: i64,
    },

    #[command(about = "Create a user")]
    Create {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
    },

    #[command(about = "Delete a user (admin only)")]
    Delete {
        #[arg(help = "User id")]
        id: i64,
    },
}

pub async fn handle(cmd: UsersCommands, ctx: CliContext) -> anyhow::Result<()> {
    match cmd {
        UsersCommands::List { page, limit } => {
            let users = ctx.client()?.list_users(page, limit).await?;
            output_value(&ctx.output, &users)
        }
        UsersCommands::Get { id } => {
            let user = ctx.client()?.get_user(id).await?;
            output_value(&ctx.output, &user)
        }
        UsersCommands::Create { email, name } => {
            let user = ctx
                .authenticated_client()?
                .create_user(&email, name.as_deref())
                .await?;
            output_success(&ctx.output, &format!("Created user {}", email), Some(user))
        }
        UsersCommands::Delete { id } => {
            ctx.authenticated_client()?.delete_user(id).await?;
            output_success(&ctx.output, &format!("Deleted user {}", id), None)
        }
    }
}
