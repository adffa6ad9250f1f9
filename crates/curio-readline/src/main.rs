use std::borrow::Cow::{self, Borrowed, Owned};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use curio_application::{ConversationController, ConversationEvent, SessionResolver};
use curio_core::conversation::{Sender, Transcript};
use curio_core::route::Navigation;
use curio_core::session::{AnswerValue, Answers};
use curio_infrastructure::{ConfigService, FileRespondentStore, HttpSurveyBackend, MemoryNavigation};

mod printer;

use printer::EventPrinter;

const SUBMIT_COMMAND: &str = "/submit";
const QUIT_COMMAND: &str = "/quit";

#[derive(Parser)]
#[command(name = "curio-readline")]
#[command(about = "Answer a Curio survey conversation from the terminal", long_about = None)]
struct Cli {
    /// Respond link, e.g. https://curio.example/survey/12/respond or /survey/12/respond
    location: String,

    /// Config file (defaults to ~/.config/curio/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Respondent state file (overrides `[storage] state_file`)
    #[arg(long)]
    state_file: Option<PathBuf>,
}

/// Completion and highlighting for the slash commands.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![SUBMIT_COMMAND.to_string(), QUIT_COMMAND.to_string()],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        self.commands
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for CliHelper {}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Runs one controller operation while rendering its events as they arrive.
///
/// Ctrl-C during the operation cancels the running stream.
async fn drive<T>(
    operation: impl Future<Output = curio_core::Result<T>>,
    cancel: &CancellationToken,
    events: &mut UnboundedReceiver<ConversationEvent>,
    printer: &mut EventPrinter,
) -> curio_core::Result<T> {
    tokio::pin!(operation);
    let result = loop {
        tokio::select! {
            result = &mut operation => break result,
            Some(event) = events.recv() => printer.print(event),
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => cancel.cancel(),
        }
    };
    while let Ok(event) = events.try_recv() {
        printer.print(event);
    }
    result
}

/// One free-text answer per respondent reply, in conversation order.
fn collect_answers(transcript: &Transcript) -> Answers {
    transcript
        .messages()
        .iter()
        .filter(|message| message.sender == Sender::Respondent)
        .enumerate()
        .map(|(index, message)| {
            (
                format!("reply_{}", index + 1),
                AnswerValue::Text(message.text.clone()),
            )
        })
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // ===== Wiring =====
    let config_service = match cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new()?,
    };
    let config = config_service.load()?;

    let store = match cli.state_file.or_else(|| config.storage.state_file.clone()) {
        Some(path) => FileRespondentStore::open(path).await?,
        None => FileRespondentStore::open_default().await?,
    };
    let store = Arc::new(store);
    let backend = Arc::new(HttpSurveyBackend::new(&config.backend)?);

    let navigation = MemoryNavigation::new(cli.location);
    let resolver = SessionResolver::for_location(&navigation, backend.clone(), store.clone())?;
    if !navigation.replacements().is_empty() {
        println!(
            "{}",
            format!("Link updated to {}", navigation.current_location()).bright_black()
        );
    }

    let (mut controller, mut events) =
        ConversationController::new(resolver, backend.clone(), backend, store, &config);
    let mut printer = EventPrinter::default();

    println!("{}", "=== Curio ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Reply to each question. '{}' sends your answers, '{}' exits.",
            SUBMIT_COMMAND, QUIT_COMMAND
        )
        .bright_black()
    );
    println!();

    let cancel = CancellationToken::new();
    if let Err(err) = drive(controller.initialize(&cancel), &cancel, &mut events, &mut printer).await
    {
        tracing::error!(error = %err, "visit cannot continue");
        return Ok(());
    }

    // ===== REPL =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    loop {
        if controller.state().is_terminal() && controller.session_id().is_none() {
            break;
        }

        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", format!("CTRL-C detected. Type '{}' to exit.", QUIT_COMMAND).yellow());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        match trimmed {
            QUIT_COMMAND => break,
            SUBMIT_COMMAND => {
                let answers = collect_answers(controller.transcript());
                let cancel = CancellationToken::new();
                match drive(
                    controller.submit_final_answers(&answers, &[]),
                    &cancel,
                    &mut events,
                    &mut printer,
                )
                .await
                {
                    Ok(receipt) => {
                        println!(
                            "{}",
                            format!(
                                "Submitted {} answers (completion time {}). Thank you!",
                                receipt.answer_count, receipt.completion_time
                            )
                            .bright_green()
                        );
                        break;
                    }
                    Err(err) => eprintln!("{}", err.to_string().red()),
                }
            }
            reply => {
                let cancel = CancellationToken::new();
                if let Err(err) = drive(
                    controller.submit_reply(reply, &cancel),
                    &cancel,
                    &mut events,
                    &mut printer,
                )
                .await
                {
                    eprintln!("{}", err.to_string().red());
                }
            }
        }
    }

    println!("{}", "Goodbye!".bright_green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use curio_core::conversation::Message;

    #[test]
    fn test_collect_answers_uses_respondent_turns() {
        let transcript = Transcript::rehydrate(vec![
            Message::local(Sender::Assistant, "Q1", 1),
            Message::local(Sender::Respondent, "yes", 2),
            Message::local(Sender::Assistant, "Q2", 3),
            Message::local(Sender::Respondent, "weekly", 4),
        ]);
        let answers = collect_answers(&transcript);
        assert_eq!(answers.len(), 2);
        assert_eq!(answers["reply_1"], AnswerValue::Text("yes".to_string()));
        assert_eq!(answers["reply_2"], AnswerValue::Text("weekly".to_string()));
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "curio-readline",
            "/survey/3/respond",
            "--state-file",
            "/tmp/state.json",
        ])
        .unwrap();
        assert_eq!(cli.location, "/survey/3/respond");
        assert_eq!(cli.state_file, Some(PathBuf::from("/tmp/state.json")));
        assert!(cli.config.is_none());
    }
}
