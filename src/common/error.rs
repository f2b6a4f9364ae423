// Error types shared by the backends and the size task
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use thiserror::Error;

/// Errors returned by a `StorageBackend`.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The credentials in use were rejected by the provider.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// The backend was asked to do something its configuration doesn't
    /// allow, e.g. listing GCS buckets without a project.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request failed in transit, timed out, or returned a response we
    /// couldn't make sense of.
    #[error("transport error: {0}")]
    Transport(String),
}

impl BackendError {
    /// Classify an HTTP status code returned alongside `message`.
    ///
    /// 401 and 403 are authorization failures, anything else is treated as
    /// a transport failure.
    pub fn from_status(status: Option<u16>, message: String) -> Self {
        match status {
            Some(401) | Some(403) => Self::Authorization(message),
            _                     => Self::Transport(message),
        }
    }
}

/// Errors returned by `SizeTask::start`.
#[derive(Debug, Error)]
pub enum TaskError {
    /// `start` was called on a task that had already been started.
    #[error("task has already been started")]
    AlreadyStarted,

    /// Bucket enumeration or the existence check failed before any listing
    /// work was dispatched.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        let tests = vec![
            (Some(401), true),
            (Some(403), true),
            (Some(404), false),
            (Some(500), false),
            (None,      false),
        ];

        for test in tests {
            let status   = test.0;
            let expected = test.1;

            let err = BackendError::from_status(status, "nope".into());
            let ret = matches!(err, BackendError::Authorization(_));

            assert_eq!(ret, expected, "status {:?}", status);
        }
    }
}
