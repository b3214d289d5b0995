use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{ChunkExtraction, DocumentExtractions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStatus {
    Matched,
    Missing,
    Extra,
}

impl AlignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Missing => "missing",
            Self::Extra => "extra",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlignedChunk<'a> {
    pub chunk_index: u64,
    pub hypothesis: Option<&'a ChunkExtraction>,
    pub ground_truth: Option<&'a ChunkExtraction>,
}

impl AlignedChunk<'_> {
    pub fn status(&self) -> AlignmentStatus {
        match (self.hypothesis, self.ground_truth) {
            (Some(_), Some(_)) => AlignmentStatus::Matched,
            (None, _) => AlignmentStatus::Missing,
            (Some(_), None) => AlignmentStatus::Extra,
        }
    }
}

pub fn align_chunks<'a>(
    hypothesis: &'a DocumentExtractions,
    ground_truth: &'a DocumentExtractions,
) -> Vec<AlignedChunk<'a>> {
    let indices = hypothesis
        .chunks()
        .iter()
        .chain(ground_truth.chunks())
        .map(|chunk| chunk.chunk_index)
        .collect::<BTreeSet<u64>>();

    indices
        .into_iter()
        .map(|chunk_index| AlignedChunk {
            chunk_index,
            hypothesis: hypothesis.chunk(chunk_index),
            ground_truth: ground_truth.chunk(chunk_index),
        })
        .collect()
}
