use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkExtraction {
    pub chunk_index: u64,
    #[serde(default)]
    pub custom_id: String,
    #[serde(default)]
    pub extraction_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_range: Option<(u64, u64)>,
}

impl ChunkExtraction {
    pub fn entries(&self, entries_key: &str) -> Vec<Value> {
        entries_of(&self.extraction_data, entries_key)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentExtractions {
    pub source_name: String,
    pub metadata: Map<String, Value>,
    chunks: Vec<ChunkExtraction>,
}

impl DocumentExtractions {
    pub fn new(
        source_name: impl Into<String>,
        metadata: Map<String, Value>,
        chunks: Vec<ChunkExtraction>,
    ) -> Self {
        let mut chunks = chunks;
        chunks.reverse();
        chunks.sort_by_key(|chunk| chunk.chunk_index);
        chunks.dedup_by_key(|chunk| chunk.chunk_index);

        Self {
            source_name: source_name.into(),
            metadata,
            chunks,
        }
    }

    pub fn empty(source_name: impl Into<String>) -> Self {
        Self::new(source_name, Map::new(), Vec::new())
    }

    pub fn chunks(&self) -> &[ChunkExtraction] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk(&self, chunk_index: u64) -> Option<&ChunkExtraction> {
        self.chunks
            .binary_search_by_key(&chunk_index, |chunk| chunk.chunk_index)
            .ok()
            .map(|position| &self.chunks[position])
    }

    pub fn flattened_payload(&self, entries_key: &str) -> Value {
        let entries = self
            .chunks
            .iter()
            .flat_map(|chunk| chunk.entries(entries_key))
            .collect::<Vec<Value>>();

        let mut payload = Map::new();
        payload.insert(entries_key.to_string(), Value::Array(entries));
        Value::Object(payload)
    }
}

pub fn entries_of(payload: &Value, entries_key: &str) -> Vec<Value> {
    match payload.get(entries_key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthMetadata {
    pub source_name: String,
    pub chunk_count: usize,
    pub is_ground_truth: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub metadata: GroundTruthMetadata,
}
