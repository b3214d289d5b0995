use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::extraction::record::RecordNormalizer;
use crate::model::{ChunkExtraction, DocumentExtractions, GroundTruthMetadata, MetadataRecord};
use crate::util::{read_optional_string, write_jsonl};

pub fn source_name_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_default()
}

pub fn load_document(path: &Path, normalizer: &RecordNormalizer) -> Result<DocumentExtractions> {
    let source_name = source_name_for(path);
    let Some(raw) = read_optional_string(path)? else {
        debug!(path = %path.display(), "chunk file missing, using empty document");
        return Ok(DocumentExtractions::empty(source_name));
    };

    Ok(parse_document(&raw, &source_name, normalizer))
}

pub fn parse_document(
    raw: &str,
    source_name: &str,
    normalizer: &RecordNormalizer,
) -> DocumentExtractions {
    let mut metadata = Map::new();
    let mut chunks = Vec::<ChunkExtraction>::new();
    let mut skipped_lines = 0_usize;

    for (line_number, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record = match serde_json::from_str::<Value>(line) {
            Ok(record) => record,
            Err(err) => {
                skipped_lines += 1;
                debug!(line = line_number + 1, error = %err, "skipping malformed record line");
                continue;
            }
        };

        match normalizer.normalize(&record, line_number as u64) {
            Some(chunk) => chunks.push(chunk),
            None => {
                if let Some(Value::Object(fields)) = record.get("metadata") {
                    metadata.extend(fields.clone());
                }
                debug!(line = line_number + 1, "skipping non-chunk record");
            }
        }
    }

    let source_name = metadata
        .get("source_name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(source_name)
        .to_string();

    let record_count = chunks.len();
    let document = DocumentExtractions::new(source_name, metadata, chunks);
    if document.chunk_count() < record_count {
        debug!(
            source = %document.source_name,
            replaced = record_count - document.chunk_count(),
            "duplicate chunk indices replaced by later records"
        );
    }
    debug!(
        source = %document.source_name,
        chunk_count = document.chunk_count(),
        skipped_lines,
        "loaded chunk document"
    );

    document
}

pub fn load_legacy_document(path: &Path) -> Result<Option<DocumentExtractions>> {
    let Some(raw) = read_optional_string(path)? else {
        return Ok(None);
    };
    let source_name = source_name_for(path);

    let extraction_data = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(object)) => Value::Object(object),
        Ok(Value::Array(entries)) => {
            let mut wrapped = Map::new();
            wrapped.insert("entries".to_string(), Value::Array(entries));
            Value::Object(wrapped)
        }
        Ok(_) => {
            warn!(path = %path.display(), "legacy ground truth is neither object nor array");
            return Ok(Some(DocumentExtractions::empty(source_name)));
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "legacy ground truth is not valid json");
            return Ok(Some(DocumentExtractions::empty(source_name)));
        }
    };

    let chunk = ChunkExtraction {
        chunk_index: 1,
        custom_id: format!("{source_name}-chunk-1"),
        extraction_data,
        chunk_text: None,
        chunk_range: None,
    };

    Ok(Some(DocumentExtractions::new(
        source_name,
        Map::new(),
        vec![chunk],
    )))
}

pub fn resolve_ground_truth_path(path: &Path) -> Option<PathBuf> {
    [
        path.with_extension("jsonl"),
        path.with_extension("json"),
        path.to_path_buf(),
    ]
    .into_iter()
    .find(|candidate| candidate.is_file())
}

pub fn load_ground_truth(
    path: &Path,
    normalizer: &RecordNormalizer,
) -> Result<Option<DocumentExtractions>> {
    let Some(resolved) = resolve_ground_truth_path(path) else {
        return Ok(None);
    };

    let is_legacy = resolved
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_legacy {
        return load_legacy_document(&resolved);
    }

    load_document(&resolved, normalizer).map(Some)
}

pub fn ground_truth_records(document: &DocumentExtractions) -> Result<Vec<Value>> {
    let header = MetadataRecord {
        metadata: GroundTruthMetadata {
            source_name: document.source_name.clone(),
            chunk_count: document.chunk_count(),
            is_ground_truth: true,
        },
    };

    let mut records = Vec::with_capacity(document.chunk_count() + 1);
    records.push(serde_json::to_value(&header).context("failed to serialize metadata record")?);
    for chunk in document.chunks() {
        records.push(
            serde_json::to_value(chunk)
                .with_context(|| format!("failed to serialize chunk {}", chunk.chunk_index))?,
        );
    }

    Ok(records)
}

pub fn save_ground_truth_jsonl(document: &DocumentExtractions, path: &Path) -> Result<()> {
    let records = ground_truth_records(document)?;
    write_jsonl(path, &records)
}
