use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

pub const DEFAULT_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    pub threshold: f64,
    pub case_sensitive: bool,
    pub normalize_whitespace: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            case_sensitive: false,
            normalize_whitespace: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub matched: bool,
    pub score: f64,
}

impl Comparison {
    const EXACT: Self = Self {
        matched: true,
        score: 1.0,
    };
    const MISS: Self = Self {
        matched: false,
        score: 0.0,
    };
}

pub fn compare_values(
    ground_truth: Option<&Value>,
    hypothesis: Option<&Value>,
    options: &CompareOptions,
) -> Comparison {
    let ground_truth = ground_truth.filter(|value| !value.is_null());
    let hypothesis = hypothesis.filter(|value| !value.is_null());

    let (gt, hyp) = match (ground_truth, hypothesis) {
        (None, None) => return Comparison::EXACT,
        (None, Some(_)) | (Some(_), None) => return Comparison::MISS,
        (Some(gt), Some(hyp)) => (gt, hyp),
    };

    match (gt, hyp) {
        (Value::Number(left), Value::Number(right)) => exact(numbers_equal(left, right)),
        (Value::Bool(left), Value::Bool(right)) => exact(left == right),
        (Value::Array(left), Value::Array(right)) => compare_lists(left, right, options),
        (Value::Object(left), Value::Object(right)) => {
            let keys = left
                .keys()
                .chain(right.keys().filter(|key| !left.contains_key(*key)))
                .collect::<Vec<&String>>();
            if keys.is_empty() {
                return Comparison::EXACT;
            }

            let mut matched = true;
            let mut total = 0.0;
            for key in &keys {
                let field = compare_values(left.get(*key), right.get(*key), options);
                matched &= field.matched;
                total += field.score;
            }

            Comparison {
                matched,
                score: total / keys.len() as f64,
            }
        }
        _ => compare_strings(&render_scalar(gt), &render_scalar(hyp), options),
    }
}

fn exact(equal: bool) -> Comparison {
    if equal {
        Comparison::EXACT
    } else {
        Comparison::MISS
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left == right;
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left == right;
    }
    if left.is_f64() || right.is_f64() {
        return left.as_f64() == right.as_f64();
    }
    false
}

fn render_scalar(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(text) => Cow::Borrowed(text.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Greedy element alignment: each ground-truth element claims its best unclaimed counterpart.
pub fn compare_lists(
    ground_truth: &[Value],
    hypothesis: &[Value],
    options: &CompareOptions,
) -> Comparison {
    match (ground_truth.is_empty(), hypothesis.is_empty()) {
        (true, true) => return Comparison::EXACT,
        (true, false) | (false, true) => return Comparison::MISS,
        (false, false) => {}
    }

    let mut consumed = vec![false; hypothesis.len()];
    let mut matched_count = 0_usize;
    let mut total = 0.0;

    for gt_item in ground_truth {
        let mut best: Option<(usize, f64)> = None;
        for (hyp_idx, hyp_item) in hypothesis.iter().enumerate() {
            if consumed[hyp_idx] {
                continue;
            }
            let score = compare_values(Some(gt_item), Some(hyp_item), options).score;
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((hyp_idx, score));
            }
        }

        if let Some((hyp_idx, score)) = best {
            total += score;
            if score >= options.threshold {
                consumed[hyp_idx] = true;
                matched_count += 1;
            }
        }
    }

    Comparison {
        matched: matched_count == ground_truth.len() && ground_truth.len() == hypothesis.len(),
        score: total / ground_truth.len() as f64,
    }
}

pub fn compare_strings(ground_truth: &str, hypothesis: &str, options: &CompareOptions) -> Comparison {
    let left = normalize_text(ground_truth, options);
    let right = normalize_text(hypothesis, options);
    if left == right {
        return Comparison::EXACT;
    }

    let score = similarity_ratio(&left, &right);
    Comparison {
        matched: score >= options.threshold,
        score,
    }
}

fn normalize_text(text: &str, options: &CompareOptions) -> String {
    let text = if options.normalize_whitespace {
        text.split_whitespace().collect::<Vec<&str>>().join(" ")
    } else {
        text.to_string()
    };

    if options.case_sensitive {
        text
    } else {
        text.to_lowercase()
    }
}

pub fn similarity_ratio(left: &str, right: &str) -> f64 {
    let max_len = left.chars().count().max(right.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(left, right) as f64 / max_len as f64
}

pub fn edit_distance(left: &str, right: &str) -> usize {
    let left = left.chars().collect::<Vec<char>>();
    let right = right.chars().collect::<Vec<char>>();
    if left.is_empty() {
        return right.len();
    }
    if right.is_empty() {
        return left.len();
    }

    let mut previous = (0..=right.len()).collect::<Vec<usize>>();
    let mut current = vec![0_usize; right.len() + 1];

    for (i, left_char) in left.iter().enumerate() {
        current[0] = i + 1;
        for (j, right_char) in right.iter().enumerate() {
            let cost = usize::from(left_char != right_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()]
}
