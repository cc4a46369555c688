use std::io::Write as _;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use clap::{Parser, Subcommand};
use frames::GameSnapshot;
use qbattle::config::DEFAULT_BASE_URL;
use qbattle::prompt::{self, DEFAULT_NAME_ATTEMPTS, NamePrompt, PromptOutcome};
use qbattle::{ChatLine, ClientConfig, ClientError, GameClient, PlayerName, SendOutcome, Session, Ui};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info, warn};

type StdinLines = Lines<BufReader<Stdin>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("name prompt cancelled")]
    Cancelled,
    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "qbattle-cli", about = "Questions Battle terminal client")]
struct Cli {
    #[arg(long, env = "QBATTLE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// duplex (WebSocket), push (SSE + HTTP) or poll (HTTP only).
    #[arg(long, env = "QBATTLE_TRANSPORT", default_value = "duplex")]
    transport: String,

    /// Write received audio clips into this directory as .mp3 files.
    #[arg(long)]
    save_audio: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Create a room and play in it.
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    /// Join an existing room by code.
    Join {
        code: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?.with_base_url(&cli.base_url)?.with_transport(cli.transport.parse()?);
    if let Some(dir) = &cli.save_audio {
        std::fs::create_dir_all(dir)?;
    }
    let mut client = GameClient::from_config(&config, TerminalUi::new(cli.save_audio))?;

    match cli.command {
        Command::Ping => run_ping(&client).await,
        Command::Create { name } => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let name = resolve_name(name, &mut lines).await?;
            client.create_game(name).await?;
            run_session(&mut client, &mut lines).await
        }
        Command::Join { code, name } => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let name = resolve_name(name, &mut lines).await?;
            client.join_game(&code, name).await?;
            run_session(&mut client, &mut lines).await
        }
    }
}

async fn run_ping(client: &GameClient<TerminalUi>) -> Result<(), CliError> {
    let body = client.health_check().await?;
    print_json(&body)
}

async fn resolve_name(flag: Option<String>, lines: &mut StdinLines) -> Result<PlayerName, CliError> {
    if let Some(raw) = flag {
        return PlayerName::parse(&raw).map_err(|e| CliError::Client(e.into()));
    }
    let mut prompt = StdinPrompt { lines };
    match prompt::prompt_player_name(&mut prompt, DEFAULT_NAME_ATTEMPTS).await {
        PromptOutcome::Submitted(name) => Ok(name),
        PromptOutcome::Cancelled => Err(CliError::Cancelled),
    }
}

// =============================================================================
// SESSION LOOP
// =============================================================================

/// One line of terminal input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Blank,
    Start,
    End,
    Status,
    Quit,
    Chat(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Self::Blank,
            "/start" => Self::Start,
            "/end" => Self::End,
            "/status" => Self::Status,
            "/quit" | "/exit" => Self::Quit,
            text => Self::Chat(text),
        }
    }
}

async fn run_session(client: &mut GameClient<TerminalUi>, lines: &mut StdinLines) -> Result<(), CliError> {
    println!("Type a question and press Enter. Commands: /start /end /status /quit");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    client.unload();
                    return Ok(());
                };
                match Input::parse(&line) {
                    Input::Blank => {}
                    Input::Start => log_failure("start", client.start_game().await),
                    Input::End => {
                        log_failure("end", client.end_game().await);
                        return Ok(());
                    }
                    Input::Status => {
                        for line in status_lines(client.session(), client.view().game.as_ref()) {
                            println!("{line}");
                        }
                    }
                    Input::Quit => {
                        client.unload();
                        return Ok(());
                    }
                    Input::Chat(text) => match client.send_chat(text).await {
                        Ok(SendOutcome::Sent) => debug!("chat sent"),
                        Ok(outcome) => debug!(?outcome, "chat not sent"),
                        Err(e) => debug!(error = %e, "chat failed"),
                    },
                }
            }
            Some(event) = client.next_event(), if client.has_event_source() => {
                client.handle_event(event);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                client.unload();
                return Ok(());
            }
        }
    }
}

/// Failures were already shown through the `Ui`; keep them in the log only.
fn log_failure(action: &str, result: Result<(), ClientError>) {
    if let Err(e) = result {
        debug!(action, error = %e, "action failed");
    }
}

/// `/status` output: stored session keys, then what the last snapshot says.
fn status_lines(session: Option<&Session>, game: Option<&GameSnapshot>) -> Vec<String> {
    let Some(session) = session else {
        return vec!["(no session)".to_owned()];
    };
    let mut lines: Vec<String> = session.entries().into_iter().map(|(key, value)| format!("{key} = {value}")).collect();
    let Some(game) = game else {
        return lines;
    };
    let players = game.players();
    if !players.is_empty() {
        lines.push(format!("players = {}", players.join(", ")));
    }
    if let Some(admin) = game.admin() {
        lines.push(format!("admin = {admin}"));
    }
    if let Some(timer) = game.timer() {
        lines.push(format!("timer = {timer}s"));
    }
    if let Some(winner) = game.winner() {
        lines.push(format!("winner = {winner}"));
    }
    if game.waiting_for_ai() {
        lines.push("waiting for the assistant...".to_owned());
    }
    lines
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

// =============================================================================
// TERMINAL FRONT-END
// =============================================================================

struct TerminalUi {
    save_audio: Option<PathBuf>,
    clips: usize,
}

impl TerminalUi {
    fn new(save_audio: Option<PathBuf>) -> Self {
        Self { save_audio, clips: 0 }
    }

    fn save_clip(&mut self, dir: &Path, audio_base64: &str) -> Result<PathBuf, CliError> {
        let bytes = B64.decode(audio_base64).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.clips += 1;
        let path = dir.join(format!("clip-{:03}.mp3", self.clips));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

impl Ui for TerminalUi {
    fn render_chat(&mut self, line: &ChatLine) {
        println!("{}: {}", line.sender, line.content);
    }

    fn render_game(&mut self, snapshot: &GameSnapshot) {
        println!("[game]\n{}", snapshot.render());
    }

    fn alert(&mut self, message: &str) {
        println!("!! {message}");
    }

    fn play_audio(&mut self, audio_base64: &str) {
        let Some(dir) = self.save_audio.clone() else {
            debug!(len = audio_base64.len(), "audio clip received");
            return;
        };
        match self.save_clip(&dir, audio_base64) {
            Ok(path) => println!("[audio] {}", path.display()),
            Err(e) => warn!(error = %e, "audio clip not saved"),
        }
    }

    fn session_changed(&mut self, session: Option<&Session>) {
        match session {
            Some(s) => debug!(room = %s.room_code(), status = s.game_status().as_wire(), "session updated"),
            None => info!("session cleared"),
        }
    }
}

struct StdinPrompt<'a> {
    lines: &'a mut StdinLines,
}

#[async_trait::async_trait]
impl NamePrompt for StdinPrompt<'_> {
    async fn ask(&mut self, question: &str) -> Option<String> {
        print!("{question} ");
        if let Err(e) = std::io::stdout().flush() {
            debug!(error = %e, "stdout flush failed");
        }
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                None
            }
        }
    }

    fn notify(&mut self, message: &str) {
        println!("{message}");
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
