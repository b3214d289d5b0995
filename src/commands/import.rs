use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::ImportArgs;
use crate::extraction::{
    EditableParser, RecordNormalizer, load_document, save_ground_truth_jsonl, source_name_for,
};
use crate::util::ensure_writable;

pub fn run(args: ImportArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let original = match &args.original {
        Some(path) => {
            let document = load_document(path, &RecordNormalizer::new()?)?;
            if document.is_empty() {
                warn!(path = %path.display(), "original document has no chunks");
            }
            Some(document)
        }
        None => None,
    };

    let source_name = args
        .source_name
        .clone()
        .or_else(|| original.as_ref().map(|document| document.source_name.clone()))
        .unwrap_or_else(|| {
            let stem = source_name_for(&args.input);
            stem.strip_suffix(".edit").unwrap_or(&stem).to_string()
        });

    let output_path = resolve_output_path(&args, &source_name)?;

    let parser = EditableParser::new()?;
    let document = parser.parse(&text, &source_name, original.as_ref());

    let parse_failures = document
        .chunks()
        .iter()
        .filter(|chunk| chunk.extraction_data.get("parse_error").is_some())
        .inspect(|chunk| warn!(chunk_index = chunk.chunk_index, "chunk body is not valid json"))
        .count();

    save_ground_truth_jsonl(&document, &output_path)?;

    info!(
        path = %output_path.display(),
        chunk_count = document.chunk_count(),
        parse_failures,
        "wrote corrected ground truth"
    );
    Ok(())
}

fn resolve_output_path(args: &ImportArgs, source_name: &str) -> Result<PathBuf> {
    let output_path = args.output.clone().unwrap_or_else(|| {
        args.input
            .with_file_name(format!("{source_name}.ground_truth.jsonl"))
    });

    if let Some(original) = &args.original
        && same_file(original, &output_path)
    {
        bail!(
            "output {} is the original chunk file; choose another --output",
            output_path.display()
        );
    }
    ensure_writable(&output_path, args.force)?;

    Ok(output_path)
}

fn same_file(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::run;
    use crate::cli::{ExportArgs, ImportArgs};
    use crate::commands::export;
    use crate::extraction::{RecordNormalizer, load_document};

    const RAW_RESPONSE: &str = concat!(
        r#"{"custom_id":"doc-chunk-1","choices":[{"message":{"content":"{\"entries\":[{\"title\":\"A\"}]}"}}],"#,
        r#""usage":{"total_tokens":42}}"#,
        "\n"
    );

    fn import_args(input: &Path) -> ImportArgs {
        ImportArgs {
            input: input.to_path_buf(),
            output: None,
            original: None,
            source_name: None,
            force: false,
        }
    }

    fn export_then_edit_path(raw_path: &Path) -> std::path::PathBuf {
        export::run(ExportArgs {
            input: raw_path.to_path_buf(),
            output: None,
            with_text: false,
            force: false,
        })
        .expect("export should succeed");
        raw_path.with_extension("edit.txt")
    }

    #[test]
    fn default_import_path_leaves_the_exported_file_untouched() {
        let dir = tempfile::tempdir().expect("temp dir");
        let raw_path = dir.path().join("doc.jsonl");
        fs::write(&raw_path, RAW_RESPONSE).expect("write raw responses");

        let edit_path = export_then_edit_path(&raw_path);
        let mut args = import_args(&edit_path);
        args.original = Some(raw_path.clone());
        run(args).expect("import should succeed");

        assert_eq!(
            fs::read_to_string(&raw_path).expect("read raw responses"),
            RAW_RESPONSE
        );

        let normalizer = RecordNormalizer::new().expect("normalizer regex should compile");
        let imported = load_document(&dir.path().join("doc.ground_truth.jsonl"), &normalizer)
            .expect("load imported ground truth");
        assert_eq!(imported.source_name, "doc");
        assert_eq!(imported.chunk_count(), 1);
        assert_eq!(imported.chunks()[0].custom_id, "doc-chunk-1");
    }

    #[test]
    fn import_never_writes_over_the_original_even_with_force() {
        let dir = tempfile::tempdir().expect("temp dir");
        let raw_path = dir.path().join("doc.jsonl");
        fs::write(&raw_path, RAW_RESPONSE).expect("write raw responses");

        let edit_path = export_then_edit_path(&raw_path);
        let mut args = import_args(&edit_path);
        args.original = Some(raw_path.clone());
        args.output = Some(raw_path.clone());
        args.force = true;

        assert!(run(args).is_err());
        assert_eq!(
            fs::read_to_string(&raw_path).expect("read raw responses"),
            RAW_RESPONSE
        );
    }

    #[test]
    fn existing_output_requires_force() {
        let dir = tempfile::tempdir().expect("temp dir");
        let edit_path = dir.path().join("doc.edit.txt");
        fs::write(&edit_path, "=== chunk 001 ===\n{\"entries\": []}\n").expect("write edit file");
        let output_path = dir.path().join("doc.ground_truth.jsonl");
        fs::write(&output_path, "keep me\n").expect("write existing output");

        assert!(run(import_args(&edit_path)).is_err());
        assert_eq!(
            fs::read_to_string(&output_path).expect("read existing output"),
            "keep me\n"
        );

        let mut args = import_args(&edit_path);
        args.force = true;
        run(args).expect("forced import should succeed");
        assert!(
            fs::read_to_string(&output_path)
                .expect("read replaced output")
                .contains("\"is_ground_truth\":true")
        );
    }
}
