use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::CompareArgs;
use crate::metrics::{
    EvaluationReport, MetricsReport, render_category_matrix, render_model_comparison,
};
use crate::util::write_text;

pub fn run(args: CompareArgs) -> Result<()> {
    let mut rows = Vec::with_capacity(args.reports.len());
    for spec in &args.reports {
        let (label, path) = parse_report_spec(spec)?;
        let raw =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let report: EvaluationReport = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        rows.push((label, report.aggregate));
    }

    let markdown = render_comparison(&rows);
    match &args.output {
        Some(path) => {
            write_text(path, &markdown)?;
            info!(path = %path.display(), reports = rows.len(), "wrote comparison tables");
        }
        None => {
            let mut output = io::BufWriter::new(io::stdout().lock());
            write!(output, "{markdown}")?;
            output.flush()?;
        }
    }

    Ok(())
}

fn parse_report_spec(spec: &str) -> Result<(String, PathBuf)> {
    match spec.split_once('=') {
        Some((label, path)) if !label.trim().is_empty() && !path.trim().is_empty() => {
            Ok((label.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => {
            let path = PathBuf::from(spec.trim());
            let label = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(ToOwned::to_owned)
                .with_context(|| format!("cannot derive a label from report path: {spec}"))?;
            Ok((label, path))
        }
    }
}

fn render_comparison(rows: &[(String, MetricsReport)]) -> String {
    let mut markdown = format!("## Model comparison\n\n{}", render_model_comparison(rows));
    if let Some(matrix) = render_category_matrix(rows) {
        markdown.push_str("\n## Micro F1 by category\n\n");
        markdown.push_str(&matrix);
    }
    markdown
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::parse_report_spec;

    #[test]
    fn parse_report_spec_supports_labels_and_bare_paths() {
        let (label, path) =
            parse_report_spec("gpt/books=reports/gpt_books.json").expect("labelled spec");
        assert_eq!(label, "gpt/books");
        assert_eq!(path, PathBuf::from("reports/gpt_books.json"));

        let (label, path) = parse_report_spec("reports/claude.json").expect("bare path");
        assert_eq!(label, "claude");
        assert_eq!(path, PathBuf::from("reports/claude.json"));
    }
}
