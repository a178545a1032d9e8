use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::config::save_session;
use crate::cli::utils::{describe_error, output_success, output_value};
use crate::cli::CliContext;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
    },

    #[command(about = "Logout from server")]
    Logout,

    #[command(about = "Show saved authentication status")]
    Status,

    #[command(about = "Extend the current session")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, ctx: CliContext) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => login(ctx, &email, &password).await,
        AuthCommands::Logout => logout(ctx).await,
        AuthCommands::Status => status(&ctx),
        AuthCommands::Refresh => {
            let refreshed = ctx.authenticated_client()?.refresh().await?;
            if refreshed.get("refreshed").and_then(Value::as_bool) != Some(true) {
                anyhow::bail!("Session could not be refreshed; login again");
            }
            output_success(&ctx.output, "Session refreshed", Some(refreshed))
        }
        AuthCommands::Whoami => {
            let user = ctx.authenticated_client()?.me().await?;
            if user.is_null() {
                anyhow::bail!("Saved session is no longer valid; login again");
            }
            output_value(&ctx.output, &user)
        }
    }
}

async fn login(mut ctx: CliContext, email: &str, password: &str) -> anyhow::Result<()> {
    let result = ctx.client()?.login(email, password).await?;
    let token = result
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("Server response did not include a token"))?;

    let server = ctx.server.clone();
    ctx.session.logged_in(&server, email, token);
    save_session(&ctx.session)?;

    output_success(
        &ctx.output,
        &format!("Logged in to {} as {}", server, email),
        result.get("user").cloned(),
    )
}

async fn logout(mut ctx: CliContext) -> anyhow::Result<()> {
    if ctx.session.token.is_some() {
        // Local state is cleared either way
        if let Err(e) = ctx.client()?.logout().await {
            tracing::warn!("Server logout failed: {}", describe_error(&anyhow::Error::new(e)));
        }
    }

    ctx.session.logged_out();
    save_session(&ctx.session)?;
    output_success(&ctx.output, "Logged out", None)
}

fn status(ctx: &CliContext) -> anyhow::Result<()> {
    let session = &ctx.session;
    let data = json!({
        "server": ctx.server,
        "authenticated": session.token.is_some(),
        "email": session.email,
        "loggedInAt": session.logged_in_at,
    });
    output_value(&ctx.output, &data)
}
