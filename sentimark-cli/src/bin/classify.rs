use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sentimark_engine::{MarkovClassifier, Settings, Verdict, logging};
use serde::Serialize;
use tracing::warn;

/// Classify reviews read from stdin, one per line.
#[derive(Parser, Debug)]
#[command(name = "sentimark-classify")]
#[command(about = "Classify reviews read from stdin, one per line")]
struct Cli {
    /// Model snapshot written by sentimark-train
    #[arg(short, long)]
    file: PathBuf,

    /// Print one JSON object per line with both scores
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Line<'a> {
    text: &'a str,
    #[serde(flatten)]
    verdict: Verdict,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load settings")?;
    logging::init(&settings.logging.filter);

    let classifier = MarkovClassifier::load(&cli.file)
        .with_context(|| format!("failed to load model from {:?}", cli.file))?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for (n, line) in stdin.lock().split(b'\n').enumerate() {
        let mut bytes = line.context("failed to read stdin")?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(line = n + 1, "skipping line with invalid UTF-8: {e}");
                continue;
            }
        };

        let verdict = classifier.evaluate(&text);
        if cli.json {
            serde_json::to_writer(
                &mut out,
                &Line {
                    text: &text,
                    verdict,
                },
            )?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", verdict.sentiment)?;
        }
    }

    out.flush()?;
    Ok(())
}
