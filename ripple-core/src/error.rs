//! Error Types
//!
//! Errors surfaced by the reactive engine.
//!
//! There are two families:
//!
//! - Usage errors (`NoOwner`, `OwnerDisposed`) are returned to the caller.
//!   They always indicate a bug at the call site.
//! - Teardown errors (`CleanupPanicked`, `DisposerPanicked`) are caught while
//!   tearing computations down and handed to the runtime's error sink, so one
//!   failing callback never blocks its siblings.
//!
//! Panics raised by a computation body are not represented here. They unwind
//! to whoever triggered the run.

use std::any::Any;

use thiserror::Error;

/// Errors produced by the reactive engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// `on_cleanup` was called while no computation was running.
    #[error("on_cleanup called outside of a running computation")]
    NoOwner,

    /// `on_cleanup` was called from a computation that has been disposed.
    #[error("on_cleanup called from a disposed computation")]
    OwnerDisposed,

    /// A cleanup callback panicked while its computation was torn down.
    #[error("cleanup callback panicked: {message}")]
    CleanupPanicked {
        /// The panic payload, rendered as text.
        message: String,
    },

    /// Disposing a root-owned computation panicked.
    #[error("root disposer panicked: {message}")]
    DisposerPanicked {
        /// The panic payload, rendered as text.
        message: String,
    },
}

/// Render a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_handles_str_and_string() {
        let payload = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload = std::panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 42");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7_u32)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn errors_render_readable_messages() {
        let err = ReactiveError::CleanupPanicked {
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "cleanup callback panicked: boom");
        assert_eq!(
            ReactiveError::NoOwner.to_string(),
            "on_cleanup called outside of a running computation"
        );
    }
}
