use clap::{Parser, Subcommand};
use shellbot::gateway::{self, WebState};
use shellbot::reply::{ConsoleSink, HttpPoster};
use shellbot::{Bot, ReplyContext};
use std::sync::Arc;
use tokio::sync::mpsc;

mod handlers;
mod shell;

#[derive(Parser)]
#[command(name = "shellbot")]
#[command(about = "Shellbot CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Talk to the bot from this terminal. `/dm` and `/ch` switch channel, `/quit` exits.
    Shell {
        /// Config file path (default: SHELLBOT_CONFIG_PATH or ~/.shellbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Also start the webserver (slash commands and outgoing webhooks)
        #[arg(long)]
        serve: bool,

        /// Webserver port (default: SHELLBOT_PORT, then config, then 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("shellbot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Shell { config, serve, port }) => {
            if let Err(e) = run_shell(config, serve, port).await {
                log::error!("shell failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = run_shell(None, false, None).await {
                log::error!("shell failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run_shell(
    config_path: Option<std::path::PathBuf>,
    serve: bool,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = shellbot::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    config.webserver.port = port.unwrap_or_else(|| shellbot::config::resolve_webserver_port(&config));

    let bot = Bot::new(
        config.bot.clone(),
        Arc::new(ConsoleSink),
        Arc::new(HttpPoster::new()),
    )?;
    handlers::register(&bot).await;

    if serve || config.webserver.enabled {
        let (inbound_tx, inbound_rx) = mpsc::channel::<ReplyContext>(64);
        bot.spawn_inbound_loop(inbound_rx);
        let state = WebState::new(&config.webserver, config.bot.name.clone(), inbound_tx);
        let bind = config.webserver.bind.clone();
        log::info!("starting webserver on {}:{}", bind, config.webserver.port);
        tokio::spawn(async move {
            if let Err(e) = gateway::run_webserver(state, &bind).await {
                log::error!("webserver failed: {}", e);
            }
        });
    }

    let session = shell::ShellSession::new(&config.shell);
    tokio::select! {
        res = shell::run(bot, session, shell::spawn_stdin_reader()) => res,
        _ = gateway::shutdown_signal() => {
            println!();
            Ok(())
        }
    }
}
