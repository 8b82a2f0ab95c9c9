/// Why a transform produced no rows.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    /// An aggregate came out as NaN or infinite.
    NonFinite {
        group: String,
        column: &'static str,
        value: f64,
    },
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite {
                group,
                column,
                value,
            } => write!(f, "non-finite {column} for group {group:?}: {value}"),
        }
    }
}

impl std::error::Error for TransformError {}
