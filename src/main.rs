use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use chat_collections::{
    util, AssistantModel, Config, Credential, HttpGateway, MockGateway, RemoteGateway,
    SessionError, SessionManager, Shell, ShellExit,
};
use clap::Parser;

/// Chat with an assistant inside named conversation collections
#[derive(Parser, Debug)]
#[command(name = "chat-collections", version, about)]
struct Cli {
    /// Base URL of the collection service
    #[arg(long)]
    server: Option<String>,

    /// Session token from the web login
    #[arg(long, env = "CHAT_COLLECTIONS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory for config and logs (default: ~/.chat-collections)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Assistant model: tinyllama, mistral or wizardlm
    #[arg(long, value_parser = parse_model)]
    model: Option<AssistantModel>,

    /// Run against an in-memory store instead of a server
    #[arg(long)]
    demo: bool,
}

fn parse_model(s: &str) -> Result<AssistantModel, String> {
    AssistantModel::parse(s)
        .ok_or_else(|| format!("unknown model '{}' (tinyllama, mistral, wizardlm)", s))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(dir) = cli.data_dir.clone() {
        util::init_data_dir(Some(dir));
    }

    let (mut config, config_warnings) = Config::load();
    if let Some(server) = cli.server.clone() {
        config = config.with_base_url(server);
    }
    if let Some(token) = cli.token.clone() {
        config = config.with_session_token(token);
    }
    if let Some(model) = cli.model {
        config = config.with_model(model);
    }

    // Log to file (<data dir>/logs/chat-collections.log)
    fs::create_dir_all(util::logs_dir())?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    for warning in &config_warnings {
        tracing::warn!("{}", warning);
        eprintln!("Warning: {}", warning);
    }

    let gateway: Arc<dyn RemoteGateway> = if cli.demo {
        tracing::info!("Using in-memory demo store");
        Arc::new(MockGateway::demo())
    } else {
        tracing::info!(base_url = %config.base_url, "Using collection service");
        Arc::new(HttpGateway::new(&config.base_url).with_cookie_name(&config.cookie_name))
    };
    let credential = Credential::new(config.session_token.clone().unwrap_or_default());

    let manager = Arc::new(SessionManager::new(gateway, credential));
    manager.controller().set_model(config.model);

    match manager.sign_in().await {
        Ok(user) => println!("Signed in as {}.", user.display_name()),
        Err(SessionError::LoginRequired) => {
            eprintln!(
                "Not signed in. Log in on the web, then pass the session token with --token \
                 or CHAT_COLLECTIONS_TOKEN."
            );
            return Ok(ExitCode::from(2));
        }
        Err(e) => {
            eprintln!("Could not check sign-in with {}: {}", config.base_url, e);
            return Ok(ExitCode::FAILURE);
        }
    }

    match manager.registry().refresh().await.map_err(SessionError::from) {
        Ok(()) => {}
        Err(SessionError::LoginRequired) => {
            eprintln!("Your session has expired. Please log in again.");
            return Ok(ExitCode::from(2));
        }
        // The list can be refreshed later with /refresh.
        Err(e) => eprintln!("Could not load collections: {}", e),
    }

    let exit = Shell::new(manager).run().await?;
    Ok(match exit {
        ShellExit::Quit | ShellExit::LoggedOut => ExitCode::SUCCESS,
        ShellExit::LoginRequired => ExitCode::from(2),
    })
}
