use std::io::{self, BufRead, Write};

use crate::actions::block_on_action;
use crate::session::Session;

pub const HELP: &str = "\
Commands:
  detect                               detect the Zotero user of the API key
  collections                          list Zotero collections
  add <doi> [@collection]              add a paper to Zotero by DOI and fetch its PDF
  sync [collection]                    attach Zotero metadata to local PDFs
  load                                 load both PDF directories for questions
  ask <question> [#tag] [@collection]  ask a question about the loaded papers
  tags                                 list tags known from the last sync
  help                                 show this help
  quit                                 leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Detect,
    Collections,
    Add {
        doi: String,
        collection: Option<String>,
    },
    Sync(Option<String>),
    Load,
    Ask {
        question: String,
        tag: Option<String>,
        collection: Option<String>,
    },
    Tags,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Parse one shell line.
pub fn parse_command(line: &str) -> ShellCommand {
    let parts: Vec<&str> = line.split_whitespace().collect();

    match parts.as_slice() {
        [] => ShellCommand::Empty,
        ["detect" | "whoami"] => ShellCommand::Detect,
        ["collections" | "cols"] => ShellCommand::Collections,
        ["add", doi, rest @ ..] => ShellCommand::Add {
            doi: doi.to_string(),
            collection: non_empty(rest.join(" ").trim_start_matches('@')),
        },
        ["sync", rest @ ..] => ShellCommand::Sync(non_empty(&rest.join(" "))),
        ["load"] => ShellCommand::Load,
        ["ask", rest @ ..] => parse_ask(rest),
        ["tags"] => ShellCommand::Tags,
        ["help" | "?"] => ShellCommand::Help,
        ["q" | "quit" | "exit"] => ShellCommand::Quit,
        _ => ShellCommand::Unknown(line.trim().to_string()),
    }
}

/// `#tag` picks a tag, `@name` starts a collection name that runs until the
/// next marker; every other word belongs to the question.
fn parse_ask(words: &[&str]) -> ShellCommand {
    let mut question = Vec::new();
    let mut collection: Vec<&str> = Vec::new();
    let mut tag = None;
    let mut in_collection = false;

    for word in words {
        if let Some(t) = word.strip_prefix('#') {
            tag = non_empty(t);
            in_collection = false;
        } else if let Some(c) = word.strip_prefix('@') {
            collection = vec![c];
            in_collection = true;
        } else if in_collection {
            collection.push(word);
        } else {
            question.push(*word);
        }
    }

    ShellCommand::Ask {
        question: question.join(" "),
        tag,
        collection: non_empty(&collection.join(" ")),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Execute one command, returning the status to print. `None` ends the shell.
pub fn execute(session: &mut Session, command: ShellCommand) -> Option<String> {
    let status = match command {
        ShellCommand::Detect => block_on_action("Error connecting to Zotero", session.detect_user()),
        ShellCommand::Collections => {
            block_on_action("Error fetching collections", session.list_collections())
        }
        ShellCommand::Add { doi, collection } => block_on_action(
            "Error adding item",
            session.add_by_doi(&doi, collection.as_deref()),
        ),
        ShellCommand::Sync(collection) => {
            block_on_action("Error during sync", session.sync(collection.as_deref()))
        }
        ShellCommand::Load => block_on_action("Error loading papers", session.load_documents()),
        ShellCommand::Ask {
            question,
            tag,
            collection,
        } => block_on_action(
            "Error answering question",
            session.ask(&question, collection.as_deref(), tag.as_deref()),
        ),
        ShellCommand::Tags => session.tags(),
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::Quit => return None,
        ShellCommand::Empty => String::new(),
        ShellCommand::Unknown(cmd) => format!("Unknown command: {cmd}. Type 'help' for commands."),
    };
    Some(status)
}

/// Read commands from `input` until `quit` or end of input.
pub fn run_shell<R: BufRead, W: Write>(session: &mut Session, input: R, mut out: W) -> io::Result<()> {
    writeln!(out, "🧠 PaperMind: ask questions about your papers. Type 'help' for commands.")?;
    write!(out, "papermind> ")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        match execute(session, parse_command(&line)) {
            Some(status) if status.is_empty() => {}
            Some(status) => writeln!(out, "{status}")?,
            None => break,
        }
        write!(out, "papermind> ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}
