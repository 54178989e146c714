use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use teamchat::prelude::*;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "teamchat")]
#[command(about = "Real-time team chat relay over WebSockets")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, env = "TEAMCHAT_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    /// JSON file the team registry is saved to
    #[arg(long, env = "TEAMCHAT_TEAMS_FILE", default_value = "teams.json")]
    teams_file: PathBuf,

    /// Keep teams in memory only (lost on restart); overrides --teams-file
    #[arg(long)]
    in_memory: bool,

    /// Close connections silent for this many seconds
    #[arg(long, env = "TEAMCHAT_IDLE_TIMEOUT_SECS")]
    idle_timeout_secs: Option<u64>,

    /// Display names are cut to this many characters
    #[arg(long, env = "TEAMCHAT_MAX_NAME_LEN", default_value_t = ChatConfig::default().max_name_len)]
    max_name_len: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind.clone(),
            teams_file: (!self.in_memory).then(|| self.teams_file.clone()),
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
            chat: ChatConfig {
                max_name_len: self.max_name_len,
                ..ChatConfig::default()
            },
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), TeamchatError> {
    let cli = Cli::parse();

    let default_directive = if cli.debug {
        "teamchat=debug,teamchat_room=debug,teamchat_registry=debug,\
         teamchat_transport=debug,info"
    } else {
        "info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config = cli.server_config();
    tracing::info!(
        bind = %config.bind_addr,
        teams_file = ?config.teams_file,
        "starting Teamchat"
    );

    let server = TeamchatServerBuilder::from_config(config).build().await?;
    tracing::info!(addr = ?server.local_addr().ok(), "listening for WebSocket clients");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("received shutdown signal");
        })
        .await
}
