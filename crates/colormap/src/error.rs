use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColormapError {
    #[error("Unknown color: {0:?}")]
    UnknownColor(String),

    #[error("Palette needs at least one color")]
    EmptyPalette,
}

pub type Result<T> = std::result::Result<T, ColormapError>;
