//! Session-level error taxonomy.
//!
//! Every variant except `TransportFailure` is recoverable: it is reported to
//! the client and the session keeps running with its state intact.

use thiserror::Error;

/// Failures raised while driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation is illegal in the current connection state. Reported
    /// as an `error` frame; the connection stays open.
    #[error("{operation} is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// An image analysis is already pending; a second submission is
    /// rejected rather than queued.
    #[error("image analysis already in progress")]
    Busy,

    /// The audio channel to the transcription collaborator stayed
    /// saturated past the forwarding deadline. The frame is dropped and
    /// recording continues.
    #[error("audio pipeline saturated, frame dropped")]
    Backpressure,

    /// An external collaborator call failed. Surfaced as a system error
    /// turn; the session continues.
    #[error("{collaborator} failed: {reason}")]
    CollaboratorFailure {
        collaborator: &'static str,
        reason: String,
    },

    /// The client transport dropped. The only fatal variant: the session
    /// closes and cleanup cascades.
    #[error("transport failure: {0}")]
    TransportFailure(String),
}

impl SessionError {
    /// Whether the session must transition to `Closed`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::TransportFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_failure_is_fatal() {
        assert!(SessionError::TransportFailure("reset by peer".into()).is_fatal());
        assert!(!SessionError::Busy.is_fatal());
        assert!(!SessionError::Backpressure.is_fatal());
        assert!(
            !SessionError::InvalidState {
                operation: "start_recording",
                state: "recording".into()
            }
            .is_fatal()
        );
        assert!(
            !SessionError::CollaboratorFailure {
                collaborator: "language model",
                reason: "timeout".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_display_names_the_operation_and_state() {
        let err = SessionError::InvalidState {
            operation: "stop_recording",
            state: "connected".into(),
        };
        assert_eq!(err.to_string(), "stop_recording is not allowed while connected");
    }
}
