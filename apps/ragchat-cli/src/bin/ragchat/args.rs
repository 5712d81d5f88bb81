use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ragchat_core::types::{Metadata, MetadataValue};

pub const USAGE: &str = "Usage: ragchat <command> [args...]

Commands:
  ingest <dir> [--limit N]                 chunk, embed and index .txt/.md files
  ask <question> [--top-k N] [--filter key=value]... [--show-context]
  chat                                     read questions from stdin, one per line
  stats                                    show index size and configuration";

#[derive(Debug, PartialEq)]
pub enum Command {
    Ingest { dir: PathBuf, limit: Option<usize> },
    Ask(AskArgs),
    Chat,
    Stats,
    Help,
}

#[derive(Debug, Default, PartialEq)]
pub struct AskArgs {
    pub question: String,
    pub top_k: Option<usize>,
    pub filters: Metadata,
    pub show_context: bool,
}

pub fn parse(args: &[String]) -> Result<Command> {
    let Some((cmd, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    match cmd.as_str() {
        "ingest" => parse_ingest(rest),
        "ask" => parse_ask(rest).map(Command::Ask),
        "chat" => Ok(Command::Chat),
        "stats" => Ok(Command::Stats),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("unknown command: {other}"),
    }
}

fn parse_ingest(args: &[String]) -> Result<Command> {
    let mut dir = None;
    let mut limit = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                limit = Some(number(args.get(i + 1), "--limit")?);
                i += 1;
            }
            a if !a.starts_with('-') => dir = Some(PathBuf::from(a)),
            a => bail!("unknown option for ingest: {a}"),
        }
        i += 1;
    }
    let dir = dir.context("ingest requires a directory")?;
    Ok(Command::Ingest { dir, limit })
}

fn parse_ask(args: &[String]) -> Result<AskArgs> {
    let mut ask = AskArgs::default();
    let mut words = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" => {
                ask.top_k = Some(number(args.get(i + 1), "--top-k")?);
                i += 1;
            }
            "--filter" => {
                let raw = args.get(i + 1).context("--filter requires key=value")?;
                let (key, value) = raw.split_once('=').context("--filter requires key=value")?;
                ask.filters.insert(key.trim().to_string(), MetadataValue::parse(value.trim()));
                i += 1;
            }
            "--show-context" => ask.show_context = true,
            a if !a.starts_with("--") => words.push(a.to_string()),
            a => bail!("unknown option for ask: {a}"),
        }
        i += 1;
    }
    ask.question = words.join(" ");
    if ask.question.trim().is_empty() {
        bail!("ask requires a question");
    }
    Ok(ask)
}

fn number(value: Option<&String>, flag: &str) -> Result<usize> {
    value
        .and_then(|v| v.parse::<usize>().ok())
        .with_context(|| format!("{flag} requires a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn ask_collects_question_words_and_repeated_filters() {
        let cmd = parse(&argv("ask how long to bake --filter category=recipes --top-k 3 --filter chunk_index=0 pie")).unwrap();
        let Command::Ask(ask) = cmd else { panic!("expected ask") };
        assert_eq!(ask.question, "how long to bake pie");
        assert_eq!(ask.top_k, Some(3));
        assert_eq!(ask.filters.get("category"), Some(&MetadataValue::String("recipes".into())));
        assert_eq!(ask.filters.get("chunk_index"), Some(&MetadataValue::Integer(0)));
        assert!(!ask.show_context);
    }

    #[test]
    fn ingest_takes_dir_and_limit() {
        assert_eq!(
            parse(&argv("ingest docs --limit 5")).unwrap(),
            Command::Ingest { dir: PathBuf::from("docs"), limit: Some(5) }
        );
        assert!(parse(&argv("ingest --limit x docs")).is_err());
        assert!(parse(&argv("ingest")).is_err());
    }

    #[test]
    fn empty_and_unknown_commands() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
        assert!(parse(&argv("frobnicate")).is_err());
        assert!(parse(&argv("ask --show-context")).is_err());
    }
}
