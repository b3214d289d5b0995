use std::fmt::Write as _;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::model::{ChunkExtraction, DocumentExtractions};

pub const PREVIEW_LINE_LIMIT: usize = 10;

pub fn chunk_marker(chunk_index: u64) -> String {
    format!("=== chunk {chunk_index:03} ===")
}

pub fn export_editable(document: &DocumentExtractions, with_text: bool) -> Result<String> {
    let mut output = String::new();

    writeln!(output, "# Editable extraction: {}", document.source_name)?;
    writeln!(output, "# Correct the JSON under each marker. Keep marker lines intact.")?;
    writeln!(output, "# Lines starting with '#' are ignored on import.")?;

    for chunk in document.chunks() {
        writeln!(output)?;
        writeln!(output, "{}", chunk_marker(chunk.chunk_index))?;

        if with_text && let Some(text) = chunk.chunk_text.as_deref() {
            write_text_preview(&mut output, text)?;
        }

        let body = serde_json::to_string_pretty(&chunk.extraction_data)
            .with_context(|| format!("failed to render chunk {}", chunk.chunk_index))?;
        writeln!(output, "{body}")?;
    }

    Ok(output)
}

fn write_text_preview(output: &mut String, text: &str) -> Result<()> {
    let lines = text.lines().collect::<Vec<&str>>();

    writeln!(output, "# source text:")?;
    for line in lines.iter().take(PREVIEW_LINE_LIMIT) {
        writeln!(output, "#   {line}")?;
    }
    if lines.len() > PREVIEW_LINE_LIMIT {
        writeln!(
            output,
            "#   ... ({} more lines)",
            lines.len() - PREVIEW_LINE_LIMIT
        )?;
    }

    Ok(())
}

pub struct EditableParser {
    chunk_marker: Regex,
}

impl EditableParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            chunk_marker: Regex::new(r"(?im)^[ \t]*===[ \t]*chunk[ \t]+(\d+)[ \t]*===[ \t]*\r?$")
                .context("failed to compile chunk marker regex")?,
        })
    }

    pub fn parse(
        &self,
        text: &str,
        source_name: &str,
        original: Option<&DocumentExtractions>,
    ) -> DocumentExtractions {
        let markers = self
            .chunk_marker
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let digits = captures.get(1)?.as_str();
                match digits.parse::<u64>() {
                    Ok(chunk_index) => Some((chunk_index, whole.start(), whole.end())),
                    Err(err) => {
                        warn!(marker = digits, error = %err, "ignoring unparseable chunk marker");
                        None
                    }
                }
            })
            .collect::<Vec<(u64, usize, usize)>>();

        let mut chunks = Vec::with_capacity(markers.len());
        for (position, &(chunk_index, _, body_start)) in markers.iter().enumerate() {
            let body_end = markers
                .get(position + 1)
                .map(|&(_, next_start, _)| next_start)
                .unwrap_or(text.len());
            let body = &text[body_start..body_end];

            let original_chunk = original.and_then(|document| document.chunk(chunk_index));
            chunks.push(ChunkExtraction {
                chunk_index,
                custom_id: original_chunk
                    .map(|chunk| chunk.custom_id.clone())
                    .filter(|custom_id| !custom_id.is_empty())
                    .unwrap_or_else(|| format!("{source_name}-chunk-{chunk_index}")),
                extraction_data: parse_chunk_body(body),
                chunk_text: original_chunk.and_then(|chunk| chunk.chunk_text.clone()),
                chunk_range: original_chunk.and_then(|chunk| chunk.chunk_range),
            });
        }

        DocumentExtractions::new(source_name, Map::new(), chunks)
    }
}

fn parse_chunk_body(body: &str) -> Value {
    let content = body
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<&str>>()
        .join("\n");

    match serde_json::from_str::<Value>(content.trim()) {
        Ok(value) => value,
        Err(err) => {
            let mut wrapped = Map::new();
            wrapped.insert("parse_error".to_string(), Value::String(err.to_string()));
            wrapped.insert(
                "raw_content".to_string(),
                Value::String(body.trim().to_string()),
            );
            Value::Object(wrapped)
        }
    }
}
