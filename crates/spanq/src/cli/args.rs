//! Clap argument definitions for the `spanq` CLI.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use spanq_results::HitProperty;

/// Parses a hit property such as `doc`, `hit:word:s` or `left:word:i:2`.
fn parse_property(s: &str) -> Result<HitProperty, String> {
    s.parse().map_err(|e| format!("{e}"))
}

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "spanq")]
#[command(about = "Span queries over annotated corpora")]
pub struct Cli {
    /// Log search activity to stderr (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// The corpus and query every search command takes.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Corpus file: a JSON array of documents
    pub corpus: PathBuf,

    /// Query: a JSON span query, @file to read one, or a single word
    pub query: String,
}

/// Arguments for `spanq search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    /// Corpus and query.
    pub input: InputArgs,

    /// Sort hits by a property
    #[arg(long, value_parser = parse_property)]
    pub sort: Option<HitProperty>,

    /// Sort in descending order
    #[arg(long, requires = "sort")]
    pub reverse: bool,

    /// Keep a random sample of this many hits
    #[arg(long, conflicts_with = "sample_fraction")]
    pub sample: Option<usize>,

    /// Keep a random sample of this fraction of hits (0.0-1.0)
    #[arg(long)]
    pub sample_fraction: Option<f64>,

    /// Seed for sampling [default: random]
    #[arg(long)]
    pub seed: Option<i64>,

    /// Index of the first hit to show
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub first: i64,

    /// Number of hits to show [default: from config]
    #[arg(short = 'n', long)]
    pub number: Option<usize>,

    /// Group hits by a property instead of listing them
    #[arg(long, value_parser = parse_property, conflicts_with = "docs")]
    pub group_by: Option<HitProperty>,

    /// Group hits per document instead of listing them
    #[arg(long)]
    pub docs: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `spanq collocations`.
#[derive(Args, Debug, Clone)]
pub struct CollocationsCommand {
    #[command(flatten)]
    /// Corpus and query.
    pub input: InputArgs,

    /// Annotation to count
    #[arg(short = 'a', long, default_value = "word")]
    pub annotation: String,

    /// Tokens on each side of a hit [default: from config]
    #[arg(short = 'c', long)]
    pub context: Option<u32>,

    /// Fold case variants together
    #[arg(short = 'i', long)]
    pub insensitive: bool,

    /// Number of collocates to show [default: from config]
    #[arg(short = 'n', long)]
    pub number: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `spanq init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global ~/.spanq.toml instead
    #[arg(long)]
    pub global: bool,

    /// Overwrite existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Supported `spanq` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Search a corpus and list, page, sort, sample or group the hits
    #[command(after_help = "\
QUERIES:
  cat                                   the word 'cat', any case
  {\"term\":{\"value\":\"Cat\",\"sensitivity\":\"sensitive\"}}
  {\"wildcard\":{\"pattern\":\"cat*\"}}
  {\"tag\":{\"name\":\"np\"}}
  {\"or\":[{\"term\":{\"value\":\"cat\"}},{\"term\":{\"value\":\"dog\"}}]}
  {\"position_filter\":{\"producer\":...,\"filter\":...,\"op\":\"within\",\"invert\":false}}
  {\"capture\":{\"name\":\"n\",\"inner\":...}}

PROPERTIES:
  doc, position, hit[:annotation[:s|i]],
  left[:annotation[:s|i][:size]], right[:annotation[:s|i][:size]]

EXAMPLES:
  spanq search corpus.json cat --sort left:word:i:1
  spanq search corpus.json cat --sample 10 --seed 42
  spanq search corpus.json @query.json --group-by hit --json")]
    Search(SearchCommand),

    /// Count the terms that occur around the hits of a query
    Collocations(CollocationsCommand),

    /// Initialize spanq configuration in current directory
    Init(InitCommand),

    /// Show effective configuration settings
    Config,
}
