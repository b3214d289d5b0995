use serde_json::{Map, Value, json};

use super::align::{AlignmentStatus, align_chunks};
use super::editable::{EditableParser, chunk_marker, export_editable};
use super::loader::{
    load_document, load_ground_truth, load_legacy_document, parse_document,
    save_ground_truth_jsonl,
};
use super::record::{RecordNormalizer, parse_or_wrap};
use crate::model::{ChunkExtraction, DocumentExtractions};

fn normalizer() -> RecordNormalizer {
    RecordNormalizer::new().expect("normalizer regex should compile")
}

fn chunk(index: u64, payload: Value, text: Option<&str>) -> ChunkExtraction {
    ChunkExtraction {
        chunk_index: index,
        custom_id: format!("book-chunk-{index}"),
        extraction_data: payload,
        chunk_text: text.map(ToOwned::to_owned),
        chunk_range: None,
    }
}

fn indices(document: &DocumentExtractions) -> Vec<u64> {
    document
        .chunks()
        .iter()
        .map(|chunk| chunk.chunk_index)
        .collect()
}

#[test]
fn chunk_index_resolves_from_custom_id_suffix_or_fallback() {
    let normalizer = normalizer();

    let suffixed = normalizer
        .normalize(&json!({"custom_id": "doc-chunk-7", "choices": []}), 2)
        .expect("suffixed record is a chunk");
    assert_eq!(suffixed.chunk_index, 7);

    let plain = normalizer
        .normalize(&json!({"custom_id": "doc", "choices": []}), 3)
        .expect("plain record is a chunk");
    assert_eq!(plain.chunk_index, 3);

    let explicit = normalizer
        .normalize(
            &json!({"custom_id": "doc-chunk-7", "chunk_index": 4, "extraction_data": {}}),
            0,
        )
        .expect("explicit index wins");
    assert_eq!(explicit.chunk_index, 4);
}

#[test]
fn ground_truth_records_keep_text_and_range() {
    let record = json!({
        "chunk_index": 2,
        "custom_id": "book-chunk-2",
        "extraction_data": {"entries": [{"title": "A"}]},
        "chunk_text": "line one\nline two",
        "chunk_range": [10, 20]
    });

    let chunk = normalizer().normalize(&record, 0).expect("ground truth chunk");
    assert_eq!(chunk.extraction_data, json!({"entries": [{"title": "A"}]}));
    assert_eq!(chunk.chunk_text.as_deref(), Some("line one\nline two"));
    assert_eq!(chunk.chunk_range, Some((10, 20)));
}

#[test]
fn response_records_read_output_text_then_choices() {
    let normalizer = normalizer();

    let output_text = json!({
        "custom_id": "book-chunk-1",
        "response": {"body": {"output_text": "{\"entries\": [{\"title\": \"A\"}]}"}}
    });
    let chunk = normalizer.normalize(&output_text, 0).expect("sync chunk");
    assert_eq!(chunk.extraction_data, json!({"entries": [{"title": "A"}]}));

    let response_data = json!({
        "custom_id": "book-chunk-2",
        "response": {"body": {"response_data": {"choices": [
            {"message": {"content": "{\"entries\": []}"}}
        ]}}}
    });
    let chunk = normalizer.normalize(&response_data, 0).expect("response_data chunk");
    assert_eq!(chunk.extraction_data, json!({"entries": []}));

    let batch = json!({
        "custom_id": "book-chunk-3",
        "response": {"status_code": 200, "body": {"choices": [
            {"message": {"content": "not json"}}
        ]}}
    });
    let chunk = normalizer.normalize(&batch, 0).expect("batch chunk");
    assert_eq!(chunk.extraction_data, json!({"raw_output": "not json"}));
}

#[test]
fn direct_choices_and_unknown_shapes() {
    let normalizer = normalizer();

    let direct = json!({
        "custom_id": "book-chunk-5",
        "choices": [{"message": {"content": "{\"entries\": [1]}"}}]
    });
    let chunk = normalizer.normalize(&direct, 0).expect("direct chunk");
    assert_eq!(chunk.chunk_index, 5);
    assert_eq!(chunk.extraction_data, json!({"entries": [1]}));

    let unknown = normalizer
        .normalize(&json!({"custom_id": "book-chunk-6", "status": "done"}), 0)
        .expect("unknown shape still yields a chunk");
    assert_eq!(unknown.extraction_data, json!({}));
}

#[test]
fn markers_and_index_zero_records_are_not_chunks() {
    let normalizer = normalizer();
    assert!(
        normalizer
            .normalize(&json!({"metadata": {"source_name": "book"}}), 5)
            .is_none()
    );
    assert!(
        normalizer
            .normalize(&json!({"batch_id": "batch_123", "status": "submitted"}), 5)
            .is_none()
    );
    assert!(normalizer.normalize(&json!({"choices": []}), 0).is_none());
    assert!(normalizer.normalize(&json!(["not", "an", "object"]), 4).is_none());
}

#[test]
fn parse_or_wrap_preserves_malformed_payloads() {
    assert_eq!(parse_or_wrap("[1, 2]"), json!([1, 2]));
    assert_eq!(parse_or_wrap("{oops"), json!({"raw_output": "{oops"}));
}

#[test]
fn parse_document_sorts_skips_and_captures_metadata() {
    let raw = [
        r#"{"metadata": {"source_name": "cookbook", "chunk_count": 2, "is_ground_truth": true}}"#,
        r#"{"chunk_index": 3, "custom_id": "cookbook-chunk-3", "extraction_data": {"entries": []}}"#,
        "this line is not json",
        "",
        r#"{"batch_id": "batch_1"}"#,
        r#"{"chunk_index": 1, "custom_id": "cookbook-chunk-1", "extraction_data": {"entries": [{"title": "A"}]}}"#,
    ]
    .join("\n");

    let document = parse_document(&raw, "fallback", &normalizer());
    assert_eq!(document.source_name, "cookbook");
    assert_eq!(indices(&document), vec![1, 3]);
    assert_eq!(document.metadata.get("chunk_count"), Some(&json!(2)));
}

#[test]
fn metadata_on_chunk_records_does_not_rename_the_document() {
    let raw = [
        r#"{"metadata": {"source_name": "cookbook"}}"#,
        r#"{"chunk_index": 1, "custom_id": "cookbook-chunk-1", "extraction_data": {"entries": []}, "metadata": {"source_name": "other"}}"#,
    ]
    .join("\n");

    let document = parse_document(&raw, "fallback", &normalizer());
    assert_eq!(document.source_name, "cookbook");
    assert_eq!(indices(&document), vec![1]);
}

#[test]
fn duplicate_indices_keep_the_later_record() {
    let raw = [
        r#"{"custom_id": "d-chunk-1", "extraction_data": {"v": "first"}}"#,
        r#"{"custom_id": "d-chunk-1", "extraction_data": {"v": "second"}}"#,
    ]
    .join("\n");

    let document = parse_document(&raw, "d", &normalizer());
    assert_eq!(document.chunk_count(), 1);
    assert_eq!(document.chunks()[0].extraction_data, json!({"v": "second"}));
}

#[test]
fn missing_files_load_as_empty_or_none() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.jsonl");

    let document = load_document(&missing, &normalizer()).expect("missing file is not an error");
    assert!(document.is_empty());
    assert_eq!(document.source_name, "absent");

    assert!(
        load_legacy_document(&dir.path().join("absent.json"))
            .expect("missing legacy file is not an error")
            .is_none()
    );
    assert!(
        load_ground_truth(&missing, &normalizer())
            .expect("missing ground truth is not an error")
            .is_none()
    );
}

#[test]
fn legacy_documents_become_a_single_chunk() {
    let dir = tempfile::tempdir().expect("temp dir");

    let object_path = dir.path().join("merged.json");
    std::fs::write(&object_path, r#"{"entries": [{"title": "A"}]}"#).expect("write legacy");
    let document = load_legacy_document(&object_path)
        .expect("legacy load")
        .expect("legacy file exists");
    assert_eq!(indices(&document), vec![1]);
    assert_eq!(document.chunks()[0].custom_id, "merged-chunk-1");

    let array_path = dir.path().join("bare.json");
    std::fs::write(&array_path, r#"[{"title": "B"}]"#).expect("write legacy array");
    let document = load_legacy_document(&array_path)
        .expect("legacy load")
        .expect("legacy file exists");
    assert_eq!(
        document.chunks()[0].extraction_data,
        json!({"entries": [{"title": "B"}]})
    );

    let corrupt_path = dir.path().join("corrupt.json");
    std::fs::write(&corrupt_path, "{ not json").expect("write corrupt legacy");
    let document = load_legacy_document(&corrupt_path)
        .expect("corrupt legacy is not an error")
        .expect("corrupt legacy file exists");
    assert!(document.is_empty());
}

#[test]
fn ground_truth_prefers_jsonl_over_legacy_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("book.json"), r#"{"entries": [{"title": "legacy"}]}"#)
        .expect("write legacy");

    let from_legacy = load_ground_truth(&dir.path().join("book.json"), &normalizer())
        .expect("load legacy")
        .expect("legacy present");
    assert_eq!(from_legacy.chunks()[0].entries("entries"), vec![json!({"title": "legacy"})]);

    let document = DocumentExtractions::new(
        "book",
        Map::new(),
        vec![chunk(2, json!({"entries": [{"title": "jsonl"}]}), None)],
    );
    save_ground_truth_jsonl(&document, &dir.path().join("book.jsonl")).expect("save jsonl");

    let loaded = load_ground_truth(&dir.path().join("book.json"), &normalizer())
        .expect("load jsonl")
        .expect("jsonl present");
    assert_eq!(indices(&loaded), vec![2]);
    assert_eq!(loaded.chunks()[0].entries("entries"), vec![json!({"title": "jsonl"})]);
}

#[test]
fn saved_ground_truth_round_trips_through_loader() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("out").join("book.jsonl");

    let mut with_range = chunk(1, json!({"entries": [{"title": "A"}]}), Some("text"));
    with_range.chunk_range = Some((0, 40));
    let original = DocumentExtractions::new(
        "book",
        Map::new(),
        vec![chunk(4, json!({"entries": []}), None), with_range],
    );
    save_ground_truth_jsonl(&original, &path).expect("save ground truth");

    let raw = std::fs::read_to_string(&path).expect("read saved file");
    let first_line = raw.lines().next().expect("metadata line");
    let header: Value = serde_json::from_str(first_line).expect("metadata json");
    assert_eq!(
        header,
        json!({"metadata": {"source_name": "book", "chunk_count": 2, "is_ground_truth": true}})
    );
    assert!(!raw.lines().nth(2).expect("second chunk").contains("chunk_text"));

    let loaded = load_document(&path, &normalizer()).expect("reload");
    assert_eq!(loaded.chunks(), original.chunks());
    assert_eq!(loaded.metadata.get("is_ground_truth"), Some(&json!(true)));
}

#[test]
fn aligner_covers_union_of_indices() {
    let hypothesis = DocumentExtractions::new(
        "h",
        Map::new(),
        vec![chunk(3, json!({}), None), chunk(1, json!({}), None)],
    );
    let ground_truth = DocumentExtractions::new(
        "g",
        Map::new(),
        vec![chunk(1, json!({}), None), chunk(2, json!({}), None)],
    );

    let aligned = align_chunks(&hypothesis, &ground_truth);
    let summary = aligned
        .iter()
        .map(|pair| (pair.chunk_index, pair.status()))
        .collect::<Vec<(u64, AlignmentStatus)>>();
    assert_eq!(
        summary,
        vec![
            (1, AlignmentStatus::Matched),
            (2, AlignmentStatus::Missing),
            (3, AlignmentStatus::Extra),
        ]
    );
    assert!(aligned[1].hypothesis.is_none());
    assert!(aligned[2].ground_truth.is_none());
}

#[test]
fn export_writes_padded_markers_and_bounded_preview() {
    let text = (1..=12)
        .map(|line| format!("source line {line}"))
        .collect::<Vec<String>>()
        .join("\n");
    let document = DocumentExtractions::new(
        "book",
        Map::new(),
        vec![chunk(7, json!({"entries": [{"title": "A"}]}), Some(text.as_str()))],
    );

    let rendered = export_editable(&document, true).expect("export");
    assert!(rendered.contains(&chunk_marker(7)));
    assert!(rendered.contains("=== chunk 007 ==="));
    assert!(rendered.contains("#   source line 10"));
    assert!(!rendered.contains("source line 11"));
    assert!(rendered.contains("2 more lines"));

    let without_text = export_editable(&document, false).expect("export");
    assert!(!without_text.contains("source line 1"));
}

#[test]
fn editable_round_trip_preserves_indices_and_payloads() {
    let original = DocumentExtractions::new(
        "book",
        Map::new(),
        vec![
            chunk(
                2,
                json!({"entries": [{"title": "B", "note": "# not a comment", "year": 2001}]}),
                Some("# heading in source\nbody"),
            ),
            chunk(10, json!({"entries": [], "summary": null}), None),
        ],
    );

    let parser = EditableParser::new().expect("parser regex should compile");
    for with_text in [true, false] {
        let rendered = export_editable(&original, with_text).expect("export");
        let imported = parser.parse(&rendered, "book", Some(&original));

        assert_eq!(indices(&imported), indices(&original));
        for (left, right) in imported.chunks().iter().zip(original.chunks()) {
            assert_eq!(left.extraction_data, right.extraction_data);
            assert_eq!(left.custom_id, right.custom_id);
            assert_eq!(left.chunk_text, right.chunk_text);
        }
    }
}

#[test]
fn import_tolerates_marker_variants_and_bad_bodies() {
    let artifact = "\
# header comment
  ===  CHUNK 3 ===
{\"entries\": [1]}

=== chunk 001 ===\r
# edited by hand
{\"entries\": [\"broken\",
";

    let parser = EditableParser::new().expect("parser regex should compile");
    let document = parser.parse(artifact, "notes", None);

    assert_eq!(indices(&document), vec![1, 3]);
    let broken = &document.chunks()[0].extraction_data;
    assert!(broken.get("parse_error").and_then(Value::as_str).is_some());
    assert!(
        broken["raw_content"]
            .as_str()
            .expect("raw content kept")
            .contains("\"broken\"")
    );
    assert_eq!(document.chunks()[1].extraction_data, json!({"entries": [1]}));
    assert_eq!(document.chunks()[1].custom_id, "notes-chunk-3");
}
