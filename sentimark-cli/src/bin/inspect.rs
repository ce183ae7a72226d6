use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sentimark_engine::{Estimator, MarkovClassifier, Settings, TransitionTable, logging};

/// Show the dimensions and most frequent transitions of a trained model.
#[derive(Parser, Debug)]
#[command(name = "sentimark-inspect")]
#[command(about = "Inspect a trained sentiment classifier")]
struct Cli {
    /// Model snapshot written by sentimark-train
    #[arg(short, long)]
    file: PathBuf,

    /// Number of most frequent transitions to list per class
    #[arg(long, default_value = "10")]
    top: usize,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Dump every nonzero count of one class as TSV (context, word, count)
    /// instead of the summary
    #[arg(long, value_enum)]
    dump: Option<Class>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Class {
    Positive,
    Negative,
}

/// Highest-order count table of a model.
fn top_table(model: &Estimator) -> Option<&TransitionTable> {
    model.tables().into_iter().last()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load settings")?;
    logging::init(&settings.logging.filter);

    let classifier = MarkovClassifier::load(&cli.file)
        .with_context(|| format!("failed to load model from {:?}", cli.file))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if let Some(class) = cli.dump {
        let model = match class {
            Class::Positive => classifier.positive(),
            Class::Negative => classifier.negative(),
        };
        let Some(table) = top_table(model) else {
            anyhow::bail!("model has no count table");
        };
        let lines = table.dump(&mut out)?;
        out.flush()?;
        eprintln!("{lines} transitions dumped");
        return Ok(());
    }

    let summary = classifier.summary();
    if cli.json {
        let classes = [
            ("positive", classifier.positive()),
            ("negative", classifier.negative()),
        ];
        let mut details = serde_json::Map::new();
        for (name, model) in classes {
            if let Some(table) = top_table(model) {
                details.insert(
                    name.to_string(),
                    serde_json::json!({
                        "stats": table.stats(),
                        "top": table.top_transitions(cli.top),
                    }),
                );
            }
        }
        let report = serde_json::json!({
            "summary": summary,
            "transitions": details,
        });
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    }

    writeln!(out, "order:     {}", summary.order)?;
    writeln!(out, "smoothing: {}", summary.smoothing)?;
    writeln!(out, "discount:  {}", summary.backoff_discount)?;
    for (name, tables, model) in [
        ("positive", &summary.positive, classifier.positive()),
        ("negative", &summary.negative, classifier.negative()),
    ] {
        writeln!(out)?;
        writeln!(out, "[{name}]")?;
        for table in tables {
            writeln!(
                out,
                "  order {}: {} contexts x {} words, {} nonzero",
                table.order, table.contexts, table.words, table.transitions
            )?;
        }
        let Some(table) = top_table(model) else {
            continue;
        };
        let stats = table.stats();
        writeln!(
            out,
            "  ones: {}  twices: {}  total: {}  unique: {}",
            stats.singletons, stats.doubletons, stats.total, stats.distinct
        )?;
        for cell in table.top_transitions(cli.top) {
            writeln!(
                out,
                "  {:>6}  {} -> {}",
                cell.count,
                cell.context.join(" "),
                cell.word
            )?;
        }
    }
    out.flush()?;
    Ok(())
}
