use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use score_catalog_server::user::{SqliteUserStore, UserManager};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Manages the users allowed to upload scores.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite user database, created if missing.
    #[clap(long, value_parser = parse_path)]
    pub user_db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a user with the given handle and password.
    AddUser {
        user_handle: String,
        password: String,
    },

    /// Sets a new password for an existing user.
    SetPassword {
        user_handle: String,
        password: String,
    },

    /// Verifies the password of a given user. No token is created.
    CheckPassword {
        user_handle: String,
        password: String,
    },
}

fn execute(command: Command, user_manager: &UserManager) -> Result<()> {
    match command {
        Command::AddUser {
            user_handle,
            password,
        } => {
            let user_id = user_manager.create_user(&user_handle)?;
            user_manager.set_password(&user_handle, &password)?;
            println!("Created user {} with id {}", user_handle, user_id);
        }
        Command::SetPassword {
            user_handle,
            password,
        } => {
            user_manager.set_password(&user_handle, &password)?;
            println!("Password of {} updated", user_handle);
        }
        Command::CheckPassword {
            user_handle,
            password,
        } => match user_manager.check_password(&user_handle, &password)? {
            Some(_) => println!("Password of {} is correct", user_handle),
            None => bail!("Wrong handle or password"),
        },
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let user_store = SqliteUserStore::new(&cli_args.user_db)
        .with_context(|| format!("Failed to open user db {:?}", cli_args.user_db))?;
    let user_manager = UserManager::new(Arc::new(user_store));

    execute(cli_args.command, &user_manager)
}
