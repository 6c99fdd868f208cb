use std::path::PathBuf;

/// Errors raised by the product-log writer.
#[derive(Debug)]
pub enum LogError {
    /// The log file (or its directory) could not be created or opened.
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Appending to the open log file failed.
    Write(std::io::Error),
    /// Moving the log file to its new name failed; the writer is unchanged.
    Rotate {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    /// The current log file no longer exists, so there is nothing to rotate.
    SourceMissing(PathBuf),
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::Open { path, source } => {
                write!(f, "cannot open log file {}: {}", path.display(), source)
            }
            LogError::Write(e) => write!(f, "log write failed: {}", e),
            LogError::Rotate { from, to, source } => write!(
                f,
                "cannot move log file {} to {}: {}",
                from.display(),
                to.display(),
                source
            ),
            LogError::SourceMissing(path) => {
                write!(f, "log file {} no longer exists", path.display())
            }
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogError::Open { source, .. } | LogError::Rotate { source, .. } => Some(source),
            LogError::Write(e) => Some(e),
            LogError::SourceMissing(_) => None,
        }
    }
}
