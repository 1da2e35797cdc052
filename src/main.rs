use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use portal_auth::store::FileTokenStore;
use portal_auth::{AuthConfig, AuthContext, AuthError, ConfigError, Guard, LoginForm, Role, RoleListGuard, SubmitOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{}", .0.user_message())]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Rejected(String),
    #[error("could not read password: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "portal-auth", about = "Sign in to a marketplace portal and inspect the session")]
struct Cli {
    #[arg(long, env = "PORTAL_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "PORTAL_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in through the given portal.
    Login {
        #[arg(long)]
        portal: Role,
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted.
        #[arg(short, long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Show the signed-in user.
    Whoami,
    Logout,
    /// Print the guard decision for the stored session.
    Check {
        #[arg(long = "role", required = true)]
        roles: Vec<Role>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AuthConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(token_file) = cli.token_file {
        config.token_file = token_file;
    }

    let store = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let ctx = AuthContext::http(config, store)?;

    match cli.command {
        Command::Login { portal, username, password } => run_login(&ctx, portal, &username, password).await,
        Command::Whoami => run_whoami(&ctx).await,
        Command::Logout => {
            ctx.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::Check { roles } => run_check(&ctx, roles).await,
    }
}

async fn run_login(ctx: &AuthContext, portal: Role, username: &str, password: Option<String>) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let form = LoginForm::for_context(portal, ctx);
    form.open();
    match form.submit(ctx, username, &password, |to| println!("redirect {to}")).await {
        SubmitOutcome::Success { .. } => Ok(()),
        SubmitOutcome::Invalid(errors) => {
            let message = [errors.username, errors.password]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("; ");
            Err(CliError::Rejected(message))
        }
        SubmitOutcome::Failed(message) | SubmitOutcome::Denied(message) => Err(CliError::Rejected(message)),
        SubmitOutcome::Busy => Err(CliError::Rejected("a login is already in progress".to_owned())),
    }
}

async fn run_whoami(ctx: &AuthContext) -> Result<(), CliError> {
    let snapshot = ctx.refresh().await;
    match snapshot.user {
        Some(user) => {
            let out = serde_json::json!({ "user": user, "roleData": snapshot.role_data });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        None => match snapshot.session_error {
            Some(e) => Err(CliError::Auth(e)),
            None => {
                println!("not signed in");
                Ok(())
            }
        },
    }
}

async fn run_check(ctx: &AuthContext, roles: Vec<Role>) -> Result<(), CliError> {
    let snapshot = ctx.refresh().await;
    let decision = RoleListGuard::allow(roles).decide(&snapshot);
    println!("{decision:?}");
    Ok(())
}

fn read_password() -> Result<String, CliError> {
    eprint!("password: ");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
