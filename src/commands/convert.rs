use anyhow::{Result, bail};
use tracing::info;

use crate::cli::ConvertArgs;
use crate::extraction::{load_legacy_document, save_ground_truth_jsonl};
use crate::model::{ChunkExtraction, DocumentExtractions};

pub fn run(args: ConvertArgs) -> Result<()> {
    let Some(legacy) = load_legacy_document(&args.input)? else {
        bail!("legacy ground truth not found: {}", args.input.display());
    };

    let document = match &args.source_name {
        Some(source_name) => rename_document(legacy, source_name),
        None => legacy,
    };

    let output_path = args
        .output
        .unwrap_or_else(|| args.input.with_extension("jsonl"));
    save_ground_truth_jsonl(&document, &output_path)?;

    info!(
        path = %output_path.display(),
        source = %document.source_name,
        chunk_count = document.chunk_count(),
        "converted legacy ground truth"
    );
    Ok(())
}

fn rename_document(document: DocumentExtractions, source_name: &str) -> DocumentExtractions {
    let chunks = document
        .chunks()
        .iter()
        .map(|chunk| ChunkExtraction {
            custom_id: format!("{source_name}-chunk-{}", chunk.chunk_index),
            ..chunk.clone()
        })
        .collect::<Vec<ChunkExtraction>>();

    DocumentExtractions::new(source_name, document.metadata, chunks)
}
