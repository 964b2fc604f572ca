//! Line-oriented terminal surface.
//!
//! Plain lines are queries; slash commands map onto workflow actions.

use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::PathBuf;
use theo_shared::{Action, Mode};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::attachments::{Attachment, AttachmentContent};
use crate::session::Session;
use crate::workflow::{Event, Reply, ReplyKind, UserInput, Workflow};

pub const HELP: &str = "\
Befehle:
  /approve              Anfrage freigeben und recherchieren
  /edit                 bereinigte Anfrage bearbeiten
  /cancel               Anfrage verwerfen
  /retry                letzte Anfrage erneut analysieren
  /new                  neue Anfrage beginnen
  /stop                 Workflow stoppen
  /requirements         Anforderungen aus der letzten Recherche
  /external             letzte Anfrage extern recherchieren
  /mode internal|external
  /model <modell>       Recherche-Modell wählen (leer = Standard)
  /attach <pfad>        Datei an die nächste Anfrage anhängen
  /state                Sitzungsstatus anzeigen
  /quit                 beenden";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Query(String),
    Action(Action),
    Mode(Mode),
    Model(String),
    Attach(PathBuf),
    State,
    Help,
    Quit,
}

/// Parse one input line. Errors are user-facing.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Query(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "approve" | "ok" => Command::Action(Action::Approve),
        "edit" => Command::Action(Action::Edit),
        "cancel" => Command::Action(Action::Cancel),
        "retry" => Command::Action(Action::Retry),
        "new" => Command::Action(Action::NewQuery),
        "stop" => Command::Action(Action::Stop),
        "requirements" | "req" => Command::Action(Action::GenerateRequirements),
        "external" => Command::Action(Action::SwitchToExternal),
        "mode" => Command::Mode(arg.parse::<Mode>()?),
        "model" => Command::Model(arg.to_string()),
        "attach" if arg.is_empty() => return Err("/attach braucht einen Pfad".to_string()),
        "attach" => Command::Attach(PathBuf::from(arg)),
        "state" => Command::State,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("Unbekannter Befehl: /{}", other)),
    };
    Ok(command)
}

fn print_reply(reply: &Reply) {
    println!();
    match reply.kind {
        ReplyKind::Error => println!("{}", reply.text.red()),
        ReplyKind::Warning => println!("{}", reply.text.yellow()),
        ReplyKind::Answer | ReplyKind::Requirements => println!("{}", reply.text.green()),
        ReplyKind::Prompt => println!("{}", reply.text.bold()),
        ReplyKind::Info | ReplyKind::Analysis | ReplyKind::Research => println!("{}", reply.text),
    }
    if !reply.actions.is_empty() {
        let hints: Vec<String> = reply
            .actions
            .iter()
            .map(|a| format!("{} ({})", a.label(), command_for(*a)))
            .collect();
        println!("{}", hints.join("   ").dimmed());
    }
}

fn command_for(action: Action) -> &'static str {
    match action {
        Action::Approve => "/approve",
        Action::Edit => "/edit",
        Action::Cancel => "/cancel",
        Action::Retry => "/retry",
        Action::SwitchToExternal => "/external",
        Action::GenerateRequirements => "/requirements",
        Action::NewQuery => "/new",
        Action::Stop => "/stop",
    }
}

fn print_state(session: &Session) {
    println!();
    println!("{} {}", "Sitzung:".bold(), session.id());
    println!("{} {}", "Modus:".bold(), session.mode());
    println!("{} {}", "Status:".bold(), session.state());
    println!(
        "{} {}",
        "Recherche-Modell:".bold(),
        session.research_model().unwrap_or("Standard")
    );
    if let Some(mapping) = session.mask_mapping() {
        println!("{} {}", "Platzhalter:".bold(), mapping.len());
    }
}

/// Run the REPL until EOF or /quit
pub async fn run(workflow: &Workflow, session: &mut Session, welcome: Vec<Reply>) -> Result<()> {
    for reply in &welcome {
        print_reply(reply);
    }
    println!("{}", "Tippe /help für alle Befehle.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut queued: Vec<Attachment> = Vec::new();

    loop {
        print!("\n{} ", "theo>".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(msg) => {
                println!("{}", msg.red());
                continue;
            }
        };

        let event = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::State => {
                print_state(session);
                continue;
            }
            Command::Attach(path) => {
                let attachment = Attachment::from_path(&path).await;
                match &attachment.content {
                    AttachmentContent::Unreadable(err) => {
                        println!("{}", format!("Fehler beim Lesen: {}", err).red())
                    }
                    _ => println!(
                        "{}",
                        format!("📎 {} ({}) für die nächste Anfrage vorgemerkt", attachment.name, attachment.mime)
                            .dimmed()
                    ),
                }
                queued.push(attachment);
                continue;
            }
            Command::Query(text) => {
                Event::Message(UserInput::with_attachments(&text, std::mem::take(&mut queued)))
            }
            Command::Action(action) => Event::Action(action),
            Command::Mode(mode) => Event::SetMode(mode),
            Command::Model(model) => Event::SetResearchModel(model),
        };

        for reply in workflow.handle(session, event).await {
            print_reply(&reply);
        }
    }

    println!();
    Ok(())
}
