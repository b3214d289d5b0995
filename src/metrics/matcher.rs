use serde_json::Value;

use crate::metrics::compare::{CompareOptions, compare_values};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryMatch {
    pub gt_index: usize,
    pub hyp_index: usize,
    pub score: f64,
}

pub fn get_nested_value<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

pub fn key_field_score(
    ground_truth: &Value,
    hypothesis: &Value,
    key_fields: &[String],
    options: &CompareOptions,
) -> f64 {
    if key_fields.is_empty() {
        return compare_values(Some(ground_truth), Some(hypothesis), options).score;
    }

    let total = key_fields
        .iter()
        .map(|path| {
            compare_values(
                get_nested_value(ground_truth, path),
                get_nested_value(hypothesis, path),
                options,
            )
            .score
        })
        .sum::<f64>();

    total / key_fields.len() as f64
}

/// Greedy ground-truth-first assignment.
///
/// Each ground-truth entry, in order, takes the best-scoring unclaimed hypothesis entry when that
/// score reaches the threshold. Ties keep the earliest hypothesis entry.
pub fn match_entries(
    ground_truth: &[Value],
    hypothesis: &[Value],
    key_fields: &[String],
    options: &CompareOptions,
) -> Vec<EntryMatch> {
    let mut claimed = vec![false; hypothesis.len()];
    let mut matches = Vec::new();

    for (gt_index, gt_entry) in ground_truth.iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for (hyp_index, hyp_entry) in hypothesis.iter().enumerate() {
            if claimed[hyp_index] {
                continue;
            }
            let score = key_field_score(gt_entry, hyp_entry, key_fields, options);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((hyp_index, score));
            }
        }

        if let Some((hyp_index, score)) = best
            && score >= options.threshold
        {
            claimed[hyp_index] = true;
            matches.push(EntryMatch {
                gt_index,
                hyp_index,
                score,
            });
        }
    }

    matches
}
