mod align;
mod editable;
mod loader;
mod record;
#[cfg(test)]
mod tests;

pub use align::{AlignedChunk, AlignmentStatus, align_chunks};
pub use editable::{EditableParser, export_editable};
pub use loader::{
    load_document, load_ground_truth, load_legacy_document, resolve_ground_truth_path,
    save_ground_truth_jsonl, source_name_for,
};
pub use record::RecordNormalizer;
