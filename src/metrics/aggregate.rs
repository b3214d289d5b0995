use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EvaluationConfig;
use crate::metrics::compare::compare_values;
use crate::metrics::matcher::{get_nested_value, match_entries};
use crate::model::entries_of;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl FieldMetrics {
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        f1_score(self.precision(), self.recall())
    }

    pub fn merge(&mut self, other: &FieldMetrics) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetrics {
    pub entry_index: usize,
    pub hypothesis_index: Option<usize>,
    pub matched: bool,
    pub match_score: f64,
    pub field_scores: BTreeMap<String, f64>,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionMetrics {
    pub field_metrics: BTreeMap<String, FieldMetrics>,
    pub entry_metrics: Vec<EntryMetrics>,
    pub total_gt_entries: usize,
    pub total_hyp_entries: usize,
    pub matched_entries: usize,
}

impl ExtractionMetrics {
    pub fn entry_precision(&self) -> f64 {
        ratio(self.matched_entries, self.total_hyp_entries)
    }

    pub fn entry_recall(&self) -> f64 {
        ratio(self.matched_entries, self.total_gt_entries)
    }

    pub fn entry_f1(&self) -> f64 {
        f1_score(self.entry_precision(), self.entry_recall())
    }

    pub fn macro_precision(&self) -> f64 {
        self.field_mean(FieldMetrics::precision)
    }

    pub fn macro_recall(&self) -> f64 {
        self.field_mean(FieldMetrics::recall)
    }

    pub fn macro_f1(&self) -> f64 {
        self.field_mean(FieldMetrics::f1)
    }

    pub fn pooled(&self) -> FieldMetrics {
        let mut pooled = FieldMetrics::default();
        for metrics in self.field_metrics.values() {
            pooled.merge(metrics);
        }
        pooled
    }

    pub fn micro_precision(&self) -> f64 {
        self.pooled().precision()
    }

    pub fn micro_recall(&self) -> f64 {
        self.pooled().recall()
    }

    pub fn micro_f1(&self) -> f64 {
        self.pooled().f1()
    }

    fn field_mean(&self, metric: fn(&FieldMetrics) -> f64) -> f64 {
        if self.field_metrics.is_empty() {
            return 0.0;
        }
        self.field_metrics.values().map(metric).sum::<f64>() / self.field_metrics.len() as f64
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn field_value<'a>(entry: &'a Value, field: &str) -> Option<&'a Value> {
    entry
        .get(field)
        .or_else(|| get_nested_value(entry, field))
        .filter(|value| !value.is_null())
}

pub fn infer_fields(entries: &[Value]) -> Vec<String> {
    entries
        .first()
        .and_then(Value::as_object)
        .map(|object| object.keys().cloned().collect())
        .unwrap_or_default()
}

pub fn compute_metrics(
    ground_truth: &Value,
    hypothesis: &Value,
    config: &EvaluationConfig,
) -> ExtractionMetrics {
    let gt_entries = entries_of(ground_truth, &config.entries_key);
    let hyp_entries = entries_of(hypothesis, &config.entries_key);
    let options = config.compare_options();

    let fields = match &config.fields_to_evaluate {
        Some(fields) => fields.clone(),
        None if gt_entries.is_empty() => infer_fields(&hyp_entries),
        None => infer_fields(&gt_entries),
    };
    let key_fields = config
        .key_fields
        .clone()
        .unwrap_or_else(|| fields.iter().take(2).cloned().collect());

    let mut field_metrics = fields
        .iter()
        .map(|field| (field.clone(), FieldMetrics::default()))
        .collect::<BTreeMap<String, FieldMetrics>>();

    let matches = match_entries(&gt_entries, &hyp_entries, &key_fields, &options);
    let mut gt_matched = vec![None; gt_entries.len()];
    let mut hyp_matched = vec![false; hyp_entries.len()];
    for entry_match in &matches {
        gt_matched[entry_match.gt_index] = Some(*entry_match);
        hyp_matched[entry_match.hyp_index] = true;
    }

    let mut entry_metrics = Vec::with_capacity(gt_entries.len());
    for (gt_index, gt_entry) in gt_entries.iter().enumerate() {
        let Some(entry_match) = gt_matched[gt_index] else {
            for field in &fields {
                if field_value(gt_entry, field).is_some() {
                    counters(&mut field_metrics, field).false_negatives += 1;
                }
            }
            entry_metrics.push(EntryMetrics {
                entry_index: gt_index,
                hypothesis_index: None,
                matched: false,
                match_score: 0.0,
                field_scores: BTreeMap::new(),
                overall_score: 0.0,
            });
            continue;
        };

        let hyp_entry = &hyp_entries[entry_match.hyp_index];
        let mut field_scores = BTreeMap::new();
        for field in &fields {
            let gt_value = field_value(gt_entry, field);
            let hyp_value = field_value(hyp_entry, field);
            let comparison = compare_values(gt_value, hyp_value, &options);
            field_scores.insert(field.clone(), comparison.score);

            let field_counters = counters(&mut field_metrics, field);
            if comparison.matched {
                field_counters.true_positives += 1;
                continue;
            }
            if hyp_value.is_some() {
                field_counters.false_positives += 1;
            }
            if gt_value.is_some() {
                field_counters.false_negatives += 1;
            }
        }

        let overall_score = if field_scores.is_empty() {
            entry_match.score
        } else {
            field_scores.values().sum::<f64>() / field_scores.len() as f64
        };
        entry_metrics.push(EntryMetrics {
            entry_index: gt_index,
            hypothesis_index: Some(entry_match.hyp_index),
            matched: true,
            match_score: entry_match.score,
            field_scores,
            overall_score,
        });
    }

    for (hyp_entry, _) in hyp_entries
        .iter()
        .zip(&hyp_matched)
        .filter(|(_, matched)| !**matched)
    {
        for field in &fields {
            if field_value(hyp_entry, field).is_some() {
                counters(&mut field_metrics, field).false_positives += 1;
            }
        }
    }

    ExtractionMetrics {
        field_metrics,
        entry_metrics,
        total_gt_entries: gt_entries.len(),
        total_hyp_entries: hyp_entries.len(),
        matched_entries: matches.len(),
    }
}

fn counters<'a>(
    field_metrics: &'a mut BTreeMap<String, FieldMetrics>,
    field: &str,
) -> &'a mut FieldMetrics {
    field_metrics.entry(field.to_string()).or_default()
}

/// Sums counters across documents. Entry indices are offset by the ground-truth entries
/// of the documents before them.
pub fn aggregate_metrics(items: &[ExtractionMetrics]) -> ExtractionMetrics {
    let mut combined = ExtractionMetrics::default();

    for metrics in items {
        let offset = combined.total_gt_entries;
        combined.entry_metrics.extend(metrics.entry_metrics.iter().map(|entry| EntryMetrics {
            entry_index: entry.entry_index + offset,
            ..entry.clone()
        }));

        for (field, field_metrics) in &metrics.field_metrics {
            counters(&mut combined.field_metrics, field).merge(field_metrics);
        }

        combined.total_gt_entries += metrics.total_gt_entries;
        combined.total_hyp_entries += metrics.total_hyp_entries;
        combined.matched_entries += metrics.matched_entries;
    }

    combined
}
