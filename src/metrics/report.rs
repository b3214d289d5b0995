use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::EvaluationConfig;
use crate::metrics::aggregate::{EntryMetrics, ExtractionMetrics, FieldMetrics};
use crate::metrics::evaluate::ChunkEvaluation;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryLevelReport {
    pub total_gt_entries: usize,
    pub total_hyp_entries: usize,
    pub matched_entries: usize,
    #[serde(flatten)]
    pub scores: Scores,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldLevelReport {
    #[serde(rename = "macro")]
    pub macro_avg: Scores,
    pub micro: Scores,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldReport {
    #[serde(flatten)]
    pub counts: FieldMetrics,
    #[serde(flatten)]
    pub scores: Scores,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub entry_level: EntryLevelReport,
    pub field_level: FieldLevelReport,
    pub per_field: BTreeMap<String, FieldReport>,
    pub entries: Vec<EntryMetrics>,
}

impl From<&ExtractionMetrics> for MetricsReport {
    fn from(metrics: &ExtractionMetrics) -> Self {
        Self {
            entry_level: EntryLevelReport {
                total_gt_entries: metrics.total_gt_entries,
                total_hyp_entries: metrics.total_hyp_entries,
                matched_entries: metrics.matched_entries,
                scores: Scores {
                    precision: metrics.entry_precision(),
                    recall: metrics.entry_recall(),
                    f1: metrics.entry_f1(),
                },
            },
            field_level: FieldLevelReport {
                macro_avg: Scores {
                    precision: metrics.macro_precision(),
                    recall: metrics.macro_recall(),
                    f1: metrics.macro_f1(),
                },
                micro: Scores {
                    precision: metrics.micro_precision(),
                    recall: metrics.micro_recall(),
                    f1: metrics.micro_f1(),
                },
            },
            per_field: metrics
                .field_metrics
                .iter()
                .map(|(field, counts)| {
                    (
                        field.clone(),
                        FieldReport {
                            counts: *counts,
                            scores: Scores {
                                precision: counts.precision(),
                                recall: counts.recall(),
                                f1: counts.f1(),
                            },
                        },
                    )
                })
                .collect(),
            entries: metrics.entry_metrics.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkReport {
    pub chunk_index: u64,
    pub status: String,
    pub metrics: MetricsReport,
}

impl From<&ChunkEvaluation> for ChunkReport {
    fn from(evaluation: &ChunkEvaluation) -> Self {
        Self {
            chunk_index: evaluation.chunk_index,
            status: evaluation.status.as_str().to_string(),
            metrics: MetricsReport::from(&evaluation.metrics),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source_name: String,
    pub ground_truth_path: String,
    pub ground_truth_sha256: String,
    pub hypothesis_path: String,
    pub hypothesis_sha256: String,
    pub ground_truth_chunks: usize,
    pub hypothesis_chunks: usize,
    pub metrics: MetricsReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<ChunkReport>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub report_version: u32,
    pub generated_at: String,
    pub config: EvaluationConfig,
    pub document_count: usize,
    pub aggregate: MetricsReport,
    pub documents: Vec<DocumentReport>,
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn render_field_table(report: &MetricsReport) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| Field | TP | FP | FN | Precision | Recall | F1 |");
    let _ = writeln!(output, "|---|---:|---:|---:|---:|---:|---:|");

    for (field, row) in &report.per_field {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} |",
            field,
            row.counts.true_positives,
            row.counts.false_positives,
            row.counts.false_negatives,
            percent(row.scores.precision),
            percent(row.scores.recall),
            percent(row.scores.f1),
        );
    }

    output
}

pub fn render_model_comparison(rows: &[(String, MetricsReport)]) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "| Model | Entry P | Entry R | Entry F1 | Micro P | Micro R | Micro F1 | Macro F1 |"
    );
    let _ = writeln!(output, "|---|---:|---:|---:|---:|---:|---:|---:|");

    for (label, report) in rows {
        let entry = &report.entry_level.scores;
        let micro = &report.field_level.micro;
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            label,
            percent(entry.precision),
            percent(entry.recall),
            percent(entry.f1),
            percent(micro.precision),
            percent(micro.recall),
            percent(micro.f1),
            percent(report.field_level.macro_avg.f1),
        );
    }

    output
}

pub fn render_category_matrix(rows: &[(String, MetricsReport)]) -> Option<String> {
    let mut cells = BTreeMap::<(&str, &str), f64>::new();
    let mut models = Vec::<&str>::new();
    let mut categories = BTreeSet::<&str>::new();

    for (label, report) in rows {
        let Some((model, category)) = label.split_once('/') else {
            continue;
        };
        if !models.contains(&model) {
            models.push(model);
        }
        categories.insert(category);
        cells.insert((model, category), report.field_level.micro.f1);
    }

    if categories.is_empty() {
        return None;
    }

    let mut output = String::new();
    let header = categories.iter().copied().collect::<Vec<&str>>().join(" | ");
    let _ = writeln!(output, "| Model | {header} |");
    let _ = writeln!(output, "|---|{}", "---:|".repeat(categories.len()));

    for model in models {
        let row = categories
            .iter()
            .map(|category| {
                cells
                    .get(&(model, *category))
                    .map(|f1| percent(*f1))
                    .unwrap_or_else(|| "-".to_string())
            })
            .collect::<Vec<String>>()
            .join(" | ");
        let _ = writeln!(output, "| {model} | {row} |");
    }

    Some(output)
}
