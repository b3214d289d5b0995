use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use crate::cli::DiffArgs;
use crate::config::DEFAULT_ENTRIES_KEY;
use crate::extraction::{
    AlignedChunk, RecordNormalizer, align_chunks, load_document, load_ground_truth,
};
use crate::model::ChunkExtraction;

#[derive(Debug, Serialize)]
struct ChunkDiff {
    chunk_index: u64,
    status: &'static str,
    gt_entries: usize,
    hyp_entries: usize,
    identical: bool,
}

pub fn run(args: DiffArgs) -> Result<()> {
    let normalizer = RecordNormalizer::new()?;
    let Some(ground_truth) = load_ground_truth(&args.ground_truth, &normalizer)? else {
        bail!("ground truth not found: {}", args.ground_truth.display());
    };
    let hypothesis = load_document(&args.hypothesis, &normalizer)?;
    let entries_key = args.entries_key.as_deref().unwrap_or(DEFAULT_ENTRIES_KEY);

    let rows = align_chunks(&hypothesis, &ground_truth)
        .iter()
        .map(|aligned| chunk_diff(aligned, entries_key))
        .collect::<Vec<ChunkDiff>>();

    info!(
        chunks = rows.len(),
        missing = rows.iter().filter(|row| row.status == "missing").count(),
        extra = rows.iter().filter(|row| row.status == "extra").count(),
        "aligned chunks"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &rows).context("failed to serialize diff")?;
        writeln!(output)?;
    } else {
        for row in &rows {
            writeln!(
                output,
                "chunk {:03}\t{}\tgt_entries={}\thyp_entries={}\t{}",
                row.chunk_index,
                row.status,
                row.gt_entries,
                row.hyp_entries,
                if row.identical { "identical" } else { "differs" }
            )?;
        }
    }
    output.flush()?;
    Ok(())
}

fn chunk_diff(aligned: &AlignedChunk<'_>, entries_key: &str) -> ChunkDiff {
    let count = |chunk: Option<&ChunkExtraction>| {
        chunk.map(|chunk| chunk.entries(entries_key).len()).unwrap_or(0)
    };

    ChunkDiff {
        chunk_index: aligned.chunk_index,
        status: aligned.status().as_str(),
        gt_entries: count(aligned.ground_truth),
        hyp_entries: count(aligned.hypothesis),
        identical: match (aligned.ground_truth, aligned.hypothesis) {
            (Some(gt), Some(hyp)) => gt.extraction_data == hyp.extraction_data,
            _ => false,
        },
    }
}
