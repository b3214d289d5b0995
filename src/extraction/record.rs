use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};

use crate::model::ChunkExtraction;

#[derive(Debug)]
enum RecordShape<'a> {
    GroundTruth(&'a Value),
    Response(&'a Value),
    Choices(&'a Value),
    Marker,
    Unrecognized,
}

impl<'a> RecordShape<'a> {
    fn classify(record: &'a Map<String, Value>) -> Self {
        if let Some(extraction_data) = record.get("extraction_data") {
            return Self::GroundTruth(extraction_data);
        }
        if let Some(body) = record.get("response").and_then(|response| response.get("body")) {
            return Self::Response(body);
        }
        if let Some(choices) = record.get("choices") {
            return Self::Choices(choices);
        }
        if record.contains_key("metadata") || record.contains_key("batch_id") {
            return Self::Marker;
        }
        Self::Unrecognized
    }
}

pub struct RecordNormalizer {
    chunk_suffix: Regex,
}

impl RecordNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            chunk_suffix: Regex::new(r"-chunk-(\d+)$")
                .context("failed to compile chunk suffix regex")?,
        })
    }

    pub fn normalize(&self, record: &Value, fallback_index: u64) -> Option<ChunkExtraction> {
        let object = record.as_object()?;
        let custom_id = object
            .get("custom_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let (extraction_data, chunk_text) = match RecordShape::classify(object) {
            RecordShape::Marker => return None,
            RecordShape::GroundTruth(data) => (
                data.clone(),
                object
                    .get("chunk_text")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned),
            ),
            RecordShape::Response(body) => (response_body_payload(body), None),
            RecordShape::Choices(choices) => (choices_payload(choices), None),
            RecordShape::Unrecognized => (Value::Object(Map::new()), None),
        };

        let chunk_index = explicit_chunk_index(object)
            .or_else(|| self.chunk_index_from_custom_id(&custom_id))
            .unwrap_or(fallback_index);

        if custom_id.is_empty() && chunk_index == 0 {
            return None;
        }

        Some(ChunkExtraction {
            chunk_index,
            custom_id,
            extraction_data,
            chunk_text,
            chunk_range: object.get("chunk_range").and_then(parse_chunk_range),
        })
    }

    pub fn chunk_index_from_custom_id(&self, custom_id: &str) -> Option<u64> {
        self.chunk_suffix
            .captures(custom_id)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| digits.as_str().parse::<u64>().ok())
    }
}

fn explicit_chunk_index(record: &Map<String, Value>) -> Option<u64> {
    match record.get("chunk_index")? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn parse_chunk_range(value: &Value) -> Option<(u64, u64)> {
    let bounds = value.as_array()?;
    match bounds.as_slice() {
        [start, end] => Some((start.as_u64()?, end.as_u64()?)),
        _ => None,
    }
}

fn response_body_payload(body: &Value) -> Value {
    if let Some(output_text) = body.get("output_text").and_then(Value::as_str) {
        return parse_or_wrap(output_text);
    }
    if let Some(choices) = body
        .get("response_data")
        .and_then(|data| data.get("choices"))
    {
        return choices_payload(choices);
    }
    if let Some(choices) = body.get("choices") {
        return choices_payload(choices);
    }
    Value::Object(Map::new())
}

fn choices_payload(choices: &Value) -> Value {
    choices
        .get(0)
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(parse_or_wrap)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

pub fn parse_or_wrap(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => {
            let mut wrapped = Map::new();
            wrapped.insert("raw_output".to_string(), Value::String(text.to_string()));
            Value::Object(wrapped)
        }
    }
}
