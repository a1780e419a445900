use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use to_markdown::{Converter, RuleSetConfig, UnmatchedPolicy};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Convert HTML to Markdown
#[derive(Parser, Debug)]
#[command(name = "to-markdown", version, about)]
struct Cli {
    /// Input HTML file; reads stdin when absent or `-`
    input: Option<PathBuf>,

    /// Write Markdown to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON rule set to use instead of the bundled rules
    #[arg(long, value_name = "FILE.json")]
    rules: Option<PathBuf>,

    /// Keep the markup of elements no rule matches
    #[arg(long)]
    keep_unmatched: bool,

    /// More logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries only Markdown
    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let mut converter = match &cli.rules {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read rule set {}", path.display()))?;
            let config = RuleSetConfig::from_json(&json)
                .with_context(|| format!("Failed to load rule set {}", path.display()))?;
            Converter::from_config(&config)
                .with_context(|| format!("Failed to load rule set {}", path.display()))?
        }
        None => Converter::new(),
    };
    if cli.keep_unmatched {
        converter.options_mut().unmatched = UnmatchedPolicy::Keep;
    }

    let input = read_input(cli.input.as_deref())?;
    debug!(bytes = input.len(), "read input");

    let markdown = converter
        .convert_bytes(&input)
        .context("Failed to convert HTML")?;

    write_output(cli.output.as_deref(), &markdown)
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        _ => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&Path>, markdown: &str) -> Result<()> {
    let mut text = markdown.to_string();
    if !text.is_empty() {
        text.push('\n');
    }

    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("Failed to write stdout")?;
            stdout.flush().context("Failed to write stdout")
        }
    }
}
