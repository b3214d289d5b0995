use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::EvaluateArgs;
use crate::config::{EvaluationConfig, load_base_config};
use crate::extraction::{
    RecordNormalizer, load_document, load_ground_truth, resolve_ground_truth_path,
    source_name_for,
};
use crate::metrics::{
    ChunkReport, DocumentReport, EvaluationReport, ExtractionMetrics, MetricsReport,
    aggregate_metrics, evaluate_chunks, evaluate_document, render_field_table,
    render_model_comparison,
};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty, write_text};

const REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone)]
struct DocumentPair {
    source_name: String,
    ground_truth: PathBuf,
    hypothesis: PathBuf,
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let pairs = resolve_document_pairs(&args.ground_truth, &args.hypothesis)?;
    let normalizer = RecordNormalizer::new()?;

    info!(
        documents = pairs.len(),
        threshold = config.threshold,
        entries_key = %config.entries_key,
        "starting evaluation"
    );

    let mut documents = Vec::with_capacity(pairs.len());
    let mut document_metrics = Vec::<ExtractionMetrics>::with_capacity(pairs.len());

    for pair in &pairs {
        let Some(ground_truth_path) = resolve_ground_truth_path(&pair.ground_truth) else {
            warn!(
                source = %pair.source_name,
                path = %pair.ground_truth.display(),
                "ground truth not found, skipping document"
            );
            continue;
        };
        let Some(ground_truth) = load_ground_truth(&ground_truth_path, &normalizer)? else {
            continue;
        };
        let hypothesis = load_document(&pair.hypothesis, &normalizer)?;

        let metrics = evaluate_document(&ground_truth, &hypothesis, &config);
        let chunks = args.per_chunk.then(|| {
            evaluate_chunks(&ground_truth, &hypothesis, &config)
                .iter()
                .map(ChunkReport::from)
                .collect::<Vec<ChunkReport>>()
        });

        info!(
            source = %pair.source_name,
            gt_chunks = ground_truth.chunk_count(),
            hyp_chunks = hypothesis.chunk_count(),
            matched_entries = metrics.matched_entries,
            entry_f1 = metrics.entry_f1(),
            micro_f1 = metrics.micro_f1(),
            "evaluated document"
        );

        documents.push(DocumentReport {
            source_name: pair.source_name.clone(),
            ground_truth_path: ground_truth_path.display().to_string(),
            ground_truth_sha256: sha256_file(&ground_truth_path)?,
            hypothesis_path: pair.hypothesis.display().to_string(),
            hypothesis_sha256: hash_if_present(&pair.hypothesis)?,
            ground_truth_chunks: ground_truth.chunk_count(),
            hypothesis_chunks: hypothesis.chunk_count(),
            metrics: MetricsReport::from(&metrics),
            chunks,
        });
        document_metrics.push(metrics);
    }

    if documents.is_empty() {
        bail!("no documents with ground truth to evaluate");
    }

    let aggregate = aggregate_metrics(&document_metrics);
    let report = EvaluationReport {
        report_version: REPORT_VERSION,
        generated_at: now_utc_string(),
        config,
        document_count: documents.len(),
        aggregate: MetricsReport::from(&aggregate),
        documents,
    };

    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.output_dir.join(format!(
            "evaluation_report_{}.json",
            utc_compact_string(Utc::now())
        ))
    });
    write_json_pretty(&report_path, &report)?;
    info!(path = %report_path.display(), "wrote evaluation report");

    if let Some(markdown_path) = &args.markdown_path {
        write_text(markdown_path, &render_markdown(&report))?;
        info!(path = %markdown_path.display(), "wrote markdown summary");
    }

    if args.json {
        write_json_stdout(&report)
    } else {
        write_text_summary(&report)
    }
}

fn resolve_config(args: &EvaluateArgs) -> Result<EvaluationConfig> {
    let mut config = load_base_config(args.config.as_deref())?;

    if let Some(entries_key) = &args.entries_key {
        config.entries_key = entries_key.clone();
    }
    if !args.fields.is_empty() {
        config.fields_to_evaluate = Some(args.fields.clone());
    }
    if !args.key_fields.is_empty() {
        config.key_fields = Some(args.key_fields.clone());
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if args.case_sensitive {
        config.case_sensitive = true;
    }
    if args.keep_whitespace {
        config.normalize_whitespace = false;
    }

    config.validate()?;
    Ok(config)
}

fn resolve_document_pairs(ground_truth: &Path, hypothesis: &Path) -> Result<Vec<DocumentPair>> {
    if !hypothesis.is_dir() {
        let source_name = source_name_for(hypothesis);
        let ground_truth = if ground_truth.is_dir() {
            ground_truth.join(format!("{source_name}.jsonl"))
        } else {
            ground_truth.to_path_buf()
        };
        return Ok(vec![DocumentPair {
            source_name,
            ground_truth,
            hypothesis: hypothesis.to_path_buf(),
        }]);
    }

    if !ground_truth.is_dir() {
        bail!(
            "hypothesis {} is a directory but ground truth {} is not",
            hypothesis.display(),
            ground_truth.display()
        );
    }

    let mut hypothesis_files = Vec::new();
    for entry in fs::read_dir(hypothesis)
        .with_context(|| format!("failed to read {}", hypothesis.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", hypothesis.display()))?
            .path();
        let is_jsonl = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
            .unwrap_or(false);
        if path.is_file() && is_jsonl {
            hypothesis_files.push(path);
        }
    }
    hypothesis_files.sort();

    Ok(hypothesis_files
        .into_iter()
        .map(|path| {
            let source_name = source_name_for(&path);
            DocumentPair {
                ground_truth: ground_truth.join(format!("{source_name}.jsonl")),
                source_name,
                hypothesis: path,
            }
        })
        .collect())
}

fn hash_if_present(path: &Path) -> Result<String> {
    if path.is_file() {
        sha256_file(path)
    } else {
        Ok(String::new())
    }
}

fn render_markdown(report: &EvaluationReport) -> String {
    let rows = report
        .documents
        .iter()
        .map(|document| (document.source_name.clone(), document.metrics.clone()))
        .chain(std::iter::once((
            "**aggregate**".to_string(),
            report.aggregate.clone(),
        )))
        .collect::<Vec<(String, MetricsReport)>>();

    format!(
        "# Extraction evaluation\n\nGenerated {} over {} document(s), threshold {}.\n\n## Documents\n\n{}\n## Fields (aggregate)\n\n{}",
        report.generated_at,
        report.document_count,
        report.config.threshold,
        render_model_comparison(&rows),
        render_field_table(&report.aggregate),
    )
}

fn write_json_stdout(report: &EvaluationReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, report)
        .context("failed to serialize evaluation report")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_summary(report: &EvaluationReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    for document in &report.documents {
        let entry = &document.metrics.entry_level;
        writeln!(
            output,
            "{}\tchunks gt={} hyp={}\tentries gt={} hyp={} matched={}\tentry_f1={:.4}\tmicro_f1={:.4}\tmacro_f1={:.4}",
            document.source_name,
            document.ground_truth_chunks,
            document.hypothesis_chunks,
            entry.total_gt_entries,
            entry.total_hyp_entries,
            entry.matched_entries,
            entry.scores.f1,
            document.metrics.field_level.micro.f1,
            document.metrics.field_level.macro_avg.f1,
        )?;
    }

    let aggregate = &report.aggregate;
    writeln!(
        output,
        "Aggregate: entries precision={:.4} recall={:.4} f1={:.4}",
        aggregate.entry_level.scores.precision,
        aggregate.entry_level.scores.recall,
        aggregate.entry_level.scores.f1,
    )?;
    writeln!(
        output,
        "Fields: micro p={:.4} r={:.4} f1={:.4}; macro p={:.4} r={:.4} f1={:.4}",
        aggregate.field_level.micro.precision,
        aggregate.field_level.micro.recall,
        aggregate.field_level.micro.f1,
        aggregate.field_level.macro_avg.precision,
        aggregate.field_level.macro_avg.recall,
        aggregate.field_level.macro_avg.f1,
    )?;
    for (field, row) in &aggregate.per_field {
        writeln!(
            output,
            "\t{field}: tp={} fp={} fn={} p={:.4} r={:.4} f1={:.4}",
            row.counts.true_positives,
            row.counts.false_positives,
            row.counts.false_negatives,
            row.scores.precision,
            row.scores.recall,
            row.scores.f1,
        )?;
    }

    output.flush()?;
    Ok(())
}
