mod aggregate;
mod compare;
mod evaluate;
mod matcher;
mod report;

pub use aggregate::{ExtractionMetrics, aggregate_metrics};
pub use compare::{CompareOptions, DEFAULT_THRESHOLD};
pub use evaluate::{evaluate_chunks, evaluate_document};
pub use report::{
    ChunkReport, DocumentReport, EvaluationReport, MetricsReport, render_category_matrix,
    render_field_table, render_model_comparison,
};
