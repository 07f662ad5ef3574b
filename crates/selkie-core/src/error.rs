pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No supported diagram dialect detected for text: {text}")]
    UnsupportedDialect { text: String },

    #[error(
        "Task \"{key}\" sits on an `after` chain with no anchored start date; give the chain an explicit start"
    )]
    UnanchoredTask { key: String },
}
