use thiserror::Error;

/// Structural and configuration failures raised while loading model tables.
/// None of these are recoverable mid-trajectory; they indicate a corrupted
/// input set and abort the run before any simulation starts.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("reaction table holds {found} reactions but metadata declares {declared}")]
    ReactionCountMismatch { declared: usize, found: usize },

    #[error("unknown distance_factor_type {0:?}, expecting \"linear\" or \"inverse_cubic\"")]
    UnknownDistanceFactor(String),

    #[error("{table} row references {field} {value} outside [0, {bound})")]
    IndexOutOfRange {
        table: &'static str,
        field: &'static str,
        value: i64,
        bound: usize,
    },

    #[error("reading model tables failed")]
    Io(#[from] std::io::Error),

    #[error("decoding model tables failed")]
    Json(#[from] serde_json::Error),
}
