/// Failures produced by the aggregation, theming and layout steps.
///
/// None of these are fatal; callers decide whether to show a message, fall back
/// to an aggregate-only view, or give up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    #[error("milestone has no issues to visualize")]
    EmptyDataset,

    #[error("unknown theme `{theme_id}`")]
    UnknownTheme { theme_id: String },

    #[error("theme `{theme_id}` has an empty palette")]
    InvalidTheme { theme_id: String },

    #[error("milestone has issues but none of them carry labels")]
    NoTaggedIssues,
}
