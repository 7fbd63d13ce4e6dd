//! CLI entry point for signon.

mod cli;

use clap::Parser;
use signon::cache::{DiskReuseTokenSource, TokenSource};
use signon::config::{load_app_config, load_oauth_config, AppConfig};
use signon::idp::IdpConfig;
use signon::session::AuthSession;
use signon::store::{DiskUserCache, User, UserCache};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = cli::Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: cli::Args) -> Result<(), Box<dyn std::error::Error>> {
    let app = load_app_config(args.app_config.as_deref().map(Path::new))?;
    let emulator_host = args
        .emulator_host
        .clone()
        .or_else(|| std::env::var("SIGNON_EMULATOR_HOST").ok());
    let idp = IdpConfig::new(&app.api_key, emulator_host.as_deref())?;

    let data_dir = match &args.data_dir {
        Some(dir) => PathBuf::from(dir),
        None => default_data_dir(),
    };
    let cache = build_user_cache(&args, &app, &data_dir);
    let session = AuthSession::new(idp, cache);

    match args.command {
        cli::Command::Login => {
            let oauth = load_oauth_config(args.client_secret.as_deref().map(Path::new))?;
            let input = BufReader::new(std::io::stdin());
            let (user, _token) = session
                .sign_in_with_console(&oauth, input, std::io::stdout())
                .await?;
            println!("Authenticated as {}.", describe_user(&user));
        }
        cli::Command::Logout => {
            session.sign_out().await;
            println!("Signed out.");
        }
        cli::Command::Status => match session.current_user().await {
            Some(user) => println!("Signed in as {}.", describe_user(&user)),
            None => println!("Not signed in. Run `signon login`."),
        },
        cli::Command::Token => {
            // Reuse a persisted token across invocations; refresh through the
            // session only when the record is missing or stale.
            let source = DiskReuseTokenSource::new(data_dir.join("token.json"), session);
            let token = source.token().await?;
            println!("{}", token.access_token);
        }
    }
    Ok(())
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("signon"))
        .unwrap_or_else(|| PathBuf::from(".signon"))
}

#[cfg(feature = "keyring")]
fn build_user_cache(args: &cli::Args, app: &AppConfig, data_dir: &Path) -> Arc<dyn UserCache> {
    if args.keyring {
        Arc::new(signon::store::KeyringUserCache::new(app.project_id.clone()))
    } else {
        Arc::new(DiskUserCache::new(data_dir.join("users")))
    }
}

#[cfg(not(feature = "keyring"))]
fn build_user_cache(_args: &cli::Args, _app: &AppConfig, data_dir: &Path) -> Arc<dyn UserCache> {
    Arc::new(DiskUserCache::new(data_dir.join("users")))
}

fn describe_user(user: &User) -> String {
    if user.email.is_empty() {
        user.user_id.clone()
    } else {
        user.email.clone()
    }
}
