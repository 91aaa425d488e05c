//! REPL front-end: one persistent transcript, one task per line.

use crate::bootstrap::BrowserConversation;
use crate::cli::parse_limit;
use crate::render::print_turn;
use anyhow::Result;
use pagepilot_runtime::{LoopOutcome, RenderFn, Transcript, Turn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Reset,
    Images(Option<usize>),
    Task(String),
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "" => Command::Empty,
        "exit" | "quit" => Command::Exit,
        "help" => Command::Help,
        "reset" => Command::Reset,
        _ => match line.strip_prefix("images ") {
            Some(arg) => match parse_limit(arg) {
                Ok(limit) => Command::Images(limit.0),
                Err(e) => Command::Invalid(e),
            },
            None => Command::Task(line.to_string()),
        },
    }
}

pub struct Repl {
    conversation: BrowserConversation,
    transcript: Transcript,
}

impl Repl {
    pub fn new(conversation: BrowserConversation) -> Self {
        Self {
            conversation,
            transcript: Transcript::new(),
        }
    }

    pub fn conversation(&self) -> &BrowserConversation {
        &self.conversation
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("PagePilot - type a task, `help` for commands, `exit` to quit.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("pagepilot> ");
            std::io::Write::flush(&mut std::io::stdout())?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                println!();
                break;
            };

            match parse_command(&line) {
                Command::Exit => break,
                Command::Empty => {}
                Command::Help => print_help(),
                Command::Reset => {
                    self.transcript = Transcript::new();
                    println!("Transcript cleared.");
                }
                Command::Images(keep) => {
                    self.conversation.configure(keep);
                    match keep {
                        Some(n) => println!("Keeping the last {n} screenshot(s)."),
                        None => println!("Keeping every screenshot."),
                    }
                }
                Command::Invalid(message) => println!("{message}"),
                Command::Task(task) => self.run_task(&task).await,
            }
        }
        Ok(())
    }

    /// Run one task; Ctrl-C stops it before the next model call.
    pub async fn run_task(&mut self, task: &str) {
        self.transcript.push(Turn::user_text(task));

        let token = self.conversation.run_token();
        let render: &RenderFn = &print_turn;
        let run = self
            .conversation
            .run_with_token(&mut self.transcript, Some(render), &token);
        tokio::pin!(run);

        let outcome = loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                _ = tokio::signal::ctrl_c(), if !token.is_cancelled() => {
                    warn!("Interrupted, stopping after the current tool batch");
                    token.cancel();
                }
            }
        };

        match outcome {
            Ok(LoopOutcome::Done { .. }) => {}
            Ok(LoopOutcome::Exhausted { iterations }) => {
                println!("Stopped after {iterations} model calls with work still pending.");
            }
            Ok(LoopOutcome::Cancelled { .. }) => println!("Task cancelled."),
            Err(e) => {
                error!("Task failed: {}", e);
                println!("Task failed: {e}");
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  exit, quit     leave PagePilot");
    println!("  reset          start a fresh transcript");
    println!("  images N|all   screenshots replayed to the model");
    println!("  help           show this message");
    println!("Anything else is sent to the model as a task.");
}
