use serde::Deserialize;

/// How row failures inside one upsert batch are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertMode {
    /// One transaction per batch. The first failing row rolls back the batch.
    #[default]
    FailFast,
    /// Each row is applied on its own. Failing rows are logged, counted and
    /// skipped; the rest commit.
    BestEffort,
}

impl std::fmt::Display for UpsertMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FailFast => "fail-fast",
            Self::BestEffort => "best-effort",
        })
    }
}
