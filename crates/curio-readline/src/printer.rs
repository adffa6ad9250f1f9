use std::io::{self, Write};

use colored::Colorize;
use curio_application::{ConversationEvent, ConversationState};
use curio_core::conversation::{Message, Sender};

/// Renders controller events on the terminal.
///
/// Assistant text arrives in slices while typing; the line is closed when the
/// message is committed.
#[derive(Default)]
pub struct EventPrinter {
    typing: bool,
}

impl EventPrinter {
    pub fn print(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::TranscriptRestored(messages) => {
                println!("{}", "--- earlier in this conversation ---".bright_black());
                for message in &messages {
                    print_message(message);
                }
                println!("{}", "------------------------------------".bright_black());
            }
            ConversationEvent::DisplayAdvanced(text) => {
                if !self.typing {
                    print!("{} ", "assistant>".bright_blue().bold());
                    self.typing = true;
                }
                print!("{}", text.bright_blue());
                let _ = io::stdout().flush();
            }
            ConversationEvent::MessageCommitted(message) => match message.sender {
                Sender::Assistant if self.typing => self.end_line(),
                Sender::Assistant => print_message(&message),
                // Already echoed by the line editor
                Sender::Respondent => {}
            },
            ConversationEvent::StreamFailed(reason) => {
                self.end_line();
                eprintln!("{}", format!("Response interrupted: {}", reason).red());
            }
            ConversationEvent::Notice(text) => {
                self.end_line();
                println!("{}", text.yellow());
            }
            ConversationEvent::StateChanged(state) => match state {
                ConversationState::Completed => {
                    self.end_line();
                    println!("{}", "Conversation complete.".bright_green());
                }
                ConversationState::Error { message } => {
                    self.end_line();
                    eprintln!("{}", message.red().bold());
                }
                other => tracing::debug!(state = %other, "state changed"),
            },
        }
    }

    fn end_line(&mut self) {
        if self.typing {
            println!();
            self.typing = false;
        }
    }
}

fn print_message(message: &Message) {
    match message.sender {
        Sender::Assistant => println!(
            "{} {}",
            "assistant>".bright_blue().bold(),
            message.text.bright_blue()
        ),
        Sender::Respondent => println!("{} {}", "you>".green().bold(), message.text.green()),
    }
}
