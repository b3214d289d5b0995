use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ExportArgs;
use crate::extraction::{RecordNormalizer, export_editable, load_document};
use crate::util::{ensure_writable, write_text};

pub fn run(args: ExportArgs) -> Result<()> {
    let normalizer = RecordNormalizer::new()?;
    let document = load_document(&args.input, &normalizer)?;
    if document.is_empty() {
        warn!(path = %args.input.display(), "no chunks found, exporting an empty file");
    }

    let output_path = args
        .output
        .unwrap_or_else(|| args.input.with_extension("edit.txt"));
    ensure_writable(&output_path, args.force)?;
    let rendered = export_editable(&document, args.with_text)?;
    write_text(&output_path, &rendered)?;

    info!(
        path = %output_path.display(),
        chunk_count = document.chunk_count(),
        with_text = args.with_text,
        "wrote editable extraction"
    );
    Ok(())
}
