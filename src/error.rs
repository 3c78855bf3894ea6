use thiserror::Error;

/// Faults surfaced to the user. None of them end the process; the session
/// stays usable and a manual reset re-runs camera acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The runtime has no media capture capability at all
    #[error("SYSTEM_FAULT: MEDIA_APIS_NOT_FOUND")]
    Unsupported,

    /// Camera permission refused; relaxing constraints cannot fix this
    #[error("AUTH_ERROR: OPTICAL_ACCESS_DENIED")]
    PermissionDenied,

    /// Every constraint profile failed for non-permission reasons
    #[error("SENSOR_FAULT: PERMANENT_IO_ERROR")]
    Exhausted,

    /// The stream opened but refused to start playing
    #[error("SYSTEM_INTERCEPT: USER_ACTION_REQUIRED")]
    PlaybackRejected,

    /// Drawing or encoding the current frame failed
    #[error("BUFFER_ERROR: FRAME_CAPTURE_FAILED")]
    CaptureFailed,

    /// The uploaded file could not be read or is not an image
    #[error("INGEST_ERROR: {0}")]
    UploadRejected(String),

    /// The analysis collaborator failed or returned an unusable result
    #[error("CORE_ERROR: {0}")]
    Analysis(String),
}

impl SessionError {
    /// Wrap a collaborator failure message, falling back to a generic code
    /// when the collaborator gave none.
    pub fn analysis(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Analysis("ANALYSIS_TIMEOUT".to_string())
        } else {
            Self::Analysis(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_error_keeps_collaborator_message() {
        let err = SessionError::analysis("quota exceeded");
        assert_eq!(err.to_string(), "CORE_ERROR: quota exceeded");
    }

    #[test]
    fn analysis_error_falls_back_when_message_is_blank() {
        let err = SessionError::analysis("  ");
        assert_eq!(err.to_string(), "CORE_ERROR: ANALYSIS_TIMEOUT");
    }
}
