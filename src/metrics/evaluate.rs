use serde_json::{Map, Value};

use crate::config::EvaluationConfig;
use crate::extraction::{AlignmentStatus, align_chunks};
use crate::metrics::aggregate::{ExtractionMetrics, compute_metrics};
use crate::model::DocumentExtractions;

#[derive(Debug, Clone)]
pub struct ChunkEvaluation {
    pub chunk_index: u64,
    pub status: AlignmentStatus,
    pub metrics: ExtractionMetrics,
}

pub fn evaluate_document(
    ground_truth: &DocumentExtractions,
    hypothesis: &DocumentExtractions,
    config: &EvaluationConfig,
) -> ExtractionMetrics {
    compute_metrics(
        &ground_truth.flattened_payload(&config.entries_key),
        &hypothesis.flattened_payload(&config.entries_key),
        config,
    )
}

pub fn evaluate_chunks(
    ground_truth: &DocumentExtractions,
    hypothesis: &DocumentExtractions,
    config: &EvaluationConfig,
) -> Vec<ChunkEvaluation> {
    let empty = Value::Object(Map::new());

    align_chunks(hypothesis, ground_truth)
        .into_iter()
        .map(|aligned| {
            let gt_payload = aligned
                .ground_truth
                .map(|chunk| &chunk.extraction_data)
                .unwrap_or(&empty);
            let hyp_payload = aligned
                .hypothesis
                .map(|chunk| &chunk.extraction_data)
                .unwrap_or(&empty);

            ChunkEvaluation {
                chunk_index: aligned.chunk_index,
                status: aligned.status(),
                metrics: compute_metrics(gt_payload, hyp_payload, config),
            }
        })
        .collect()
}
