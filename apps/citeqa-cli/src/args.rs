use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

use citeqa_core::types::Mode;

pub const USAGE: &str = "Usage: citeqa <command> [args...]

Commands:
  ingest [raw_dir]                                   rebuild the corpus from text sources
  build-index                                        rebuild lexical and vector indexes
  ask <query> [--k N] [--mode baseline|rerank]       answer a question (JSON)
  features <questions.jsonl> [--out PATH] [--top-k N]
  train <features.jsonl> [--out PATH] [--seed N]
  eval <questions.jsonl> [--out PATH] [--k N]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ingest { raw_dir: Option<PathBuf> },
    BuildIndex,
    Ask { query: String, k: Option<usize>, mode: Mode },
    Features { questions: PathBuf, out: Option<PathBuf>, top_k: usize },
    Train { features: PathBuf, out: Option<PathBuf>, seed: u64 },
    Eval { questions: PathBuf, out: Option<PathBuf>, k: Option<usize> },
}

pub const DEFAULT_FEATURE_TOP_K: usize = 20;

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i).map(String::as_str).ok_or_else(|| anyhow!("{} requires a value", flag))
}

fn number<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> Result<T> {
    let raw = value(args, i, flag)?;
    raw.parse::<T>().map_err(|_| anyhow!("{} requires a number, got '{}'", flag, raw))
}

/// Parse everything after the program name.
pub fn parse(args: &[String]) -> Result<Command> {
    let Some((cmd, rest)) = args.split_first() else { bail!("missing command\n\n{}", USAGE) };
    let mut positional: Vec<&str> = Vec::new();
    let mut k = None; let mut mode = Mode::default(); let mut out = None; let mut top_k = DEFAULT_FEATURE_TOP_K; let mut seed = 42u64;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--k" | "-k" => k = Some(number(rest, &mut i, "--k")?),
            "--mode" => mode = value(rest, &mut i, "--mode")?.parse()?,
            "--out" | "-o" => out = Some(PathBuf::from(value(rest, &mut i, "--out")?)),
            "--top-k" => top_k = number(rest, &mut i, "--top-k")?,
            "--seed" => seed = number(rest, &mut i, "--seed")?,
            flag if flag.starts_with("--") => bail!("unknown option '{}'\n\n{}", flag, USAGE),
            arg => positional.push(arg),
        }
        i += 1;
    }
    let first = |what: &str| positional.first().map(|s| PathBuf::from(*s)).ok_or_else(|| anyhow!("{} requires {}\n\n{}", cmd, what, USAGE));
    let command = match cmd.as_str() {
        "ingest" => Command::Ingest { raw_dir: positional.first().map(PathBuf::from) },
        "build-index" => Command::BuildIndex,
        "ask" => {
            if positional.is_empty() { bail!("ask requires a query\n\n{}", USAGE); }
            Command::Ask { query: positional.join(" "), k, mode }
        }
        "features" => Command::Features { questions: first("a questions file")?, out, top_k },
        "train" => Command::Train { features: first("a features file")?, out, seed },
        "eval" => Command::Eval { questions: first("a questions file")?, out, k },
        "help" | "--help" | "-h" => bail!("{}", USAGE),
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    };
    Ok(command)
}
