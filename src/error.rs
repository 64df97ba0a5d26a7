use std::path::PathBuf;

/// Errors that can occur in rufuzzion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("k-mer rank file error: {0}")]
    Rank(String),

    #[error("pattern file error: {0}")]
    Pattern(String),

    #[error("FASTQ error: {0}")]
    Fastq(String),

    #[error("BAM error: {0}")]
    Bam(String),

    #[error("hit file error: {0}")]
    HitFormat(String),

    #[error("{0}")]
    Consistency(String),

    #[error("too many hits")]
    Capacity,
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            source: err,
            path: PathBuf::from("<unknown>"),
        }
    }
}
