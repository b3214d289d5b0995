use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "chunkeval",
    version,
    about = "Chunk-level evaluation and correction of LLM extraction output"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Evaluate(EvaluateArgs),
    Diff(DiffArgs),
    Export(ExportArgs),
    Import(ImportArgs),
    Convert(ConvertArgs),
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub ground_truth: PathBuf,

    #[arg(long)]
    pub hypothesis: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub entries_key: Option<String>,

    #[arg(long = "field")]
    pub fields: Vec<String>,

    #[arg(long = "key-field")]
    pub key_fields: Vec<String>,

    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long, default_value_t = false)]
    pub case_sensitive: bool,

    #[arg(long, default_value_t = false)]
    pub keep_whitespace: bool,

    #[arg(long, default_value_t = false)]
    pub per_chunk: bool,

    #[arg(long, default_value = "reports")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub markdown_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DiffArgs {
    #[arg(long)]
    pub ground_truth: PathBuf,

    #[arg(long)]
    pub hypothesis: PathBuf,

    #[arg(long)]
    pub entries_key: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub with_text: bool,

    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub original: Option<PathBuf>,

    #[arg(long)]
    pub source_name: Option<String>,

    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub source_name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(long = "report", required = true)]
    pub reports: Vec<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}
