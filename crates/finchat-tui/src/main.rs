//! Finchat terminal client.
//!
//! Logs in against the backend, then runs the chat session on a background
//! runtime thread while the UI loop owns the terminal on the main thread.

use std::error::Error;
use std::io::Write as _;
use std::sync::Mutex;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

mod app;
mod state;
mod ui;

use app::App;
use finchat_client::{
    AuthClient, ChatSession, Config, Connection, MessageStore, Reconciler, SessionCommand,
    SessionUpdate, TokenCache,
};

#[derive(Parser)]
#[command(name = "finchat")]
#[command(about = "Terminal client for the finance bot")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides FINCHAT_SERVER_URL).
    #[arg(short, long)]
    server: Option<String>,

    /// Password for login. Prompted when omitted and no token is cached.
    #[arg(short, long)]
    password: Option<String>,

    /// Ignore the cached token and log in again.
    #[arg(long)]
    fresh_login: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to a file to avoid interfering with the terminal UI.
    if let Ok(file) = std::fs::File::create("/tmp/finchat-tui.log") {
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_env_filter("finchat=debug,finchat_client=debug")
            .with_ansi(false)
            .init();
    }

    let cli = Cli::parse();
    let mut config = Config::default();
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    let rt = tokio::runtime::Runtime::new()?;

    let token_cache = TokenCache::new(config.token_path());
    if cli.fresh_login {
        token_cache.clear();
    }

    // A cached token skips the login prompt; an explicit password forces a
    // fresh login.
    let token = match token_cache.load() {
        Some(token) if cli.password.is_none() => token,
        _ => {
            let password = match cli.password {
                Some(password) => password,
                None => prompt_password()?,
            };
            let auth = AuthClient::new(&config.server_url);
            let token = match rt.block_on(auth.login(&password)) {
                Ok(token) => token,
                Err(e) => {
                    eprintln!("Login failed: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = token_cache.save(&token) {
                eprintln!("warning: could not cache token: {e}");
            }
            token
        }
    };

    info!(server = %config.server_url, "starting finchat");

    // Channels between the UI thread and the session task.
    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(100);
    let (update_tx, update_rx) = mpsc::channel::<SessionUpdate>(100);

    // The session runs on a background thread with its own runtime.
    let session_config = config.clone();
    let bg_handle = std::thread::spawn(move || {
        rt.block_on(run_session(session_config, token, cmd_rx, update_tx));
    });

    // Initialize terminal (enters alternate screen, enables raw mode).
    let terminal = ratatui::init();
    let mut app = App::new(update_rx, cmd_tx);
    let result = app.run(terminal);
    ratatui::restore();

    let _ = bg_handle.join();

    if app.logout_requested() {
        token_cache.clear();
        println!("Logged out.");
    }

    info!("finchat shutdown complete");
    result.map_err(Into::into)
}

async fn run_session(
    config: Config,
    token: String,
    commands: mpsc::Receiver<SessionCommand>,
    updates: mpsc::Sender<SessionUpdate>,
) {
    let store = MessageStore::new(config.history_path());
    let connection = Connection::new(config);
    let events = connection.subscribe();
    let reconciler = Reconciler::new(store, connection.clone());

    connection.connect(&token);
    ChatSession::new(reconciler, events)
        .run(commands, updates)
        .await;
    connection.disconnect();
}

fn prompt_password() -> std::io::Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "Password: ")?;
    stdout.flush()?;
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    Ok(password.trim().to_string())
}
