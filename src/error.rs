pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("null argument: {0} must be set")]
    NullArgument(&'static str),

    #[error("worker returned {value} at index {index}, outside [0, {threshold}]")]
    WorkerContract {
        index: usize,
        value: u32,
        threshold: u32,
    },

    #[error("image export failed: {0}")]
    Export(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
