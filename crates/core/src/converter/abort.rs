//! Cancellation shared by every part of one conversion.

use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::ConvertError;

/// One cancellation token plus the slot holding the error that settles the
/// conversion.
///
/// The first call to [`abort`](Self::abort) records its error and cancels the
/// token. Later calls are ignored apart from a debug log.
#[derive(Debug, Default)]
pub struct AbortController {
    token: CancellationToken,
    first_error: Mutex<Option<ConvertError>>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token observed by the parser and pipelines.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Records `error` if it is the first one and cancels the token.
    ///
    /// Returns `true` if this call recorded the error.
    pub fn abort(&self, error: ConvertError) -> bool {
        let recorded = {
            let mut slot = self
                .first_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                debug!("Aborting conversion: {}", error);
                *slot = Some(error);
                true
            } else {
                debug!("Ignoring error after abort: {}", error);
                false
            }
        };
        self.token.cancel();
        recorded
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Takes the recorded error, if any.
    pub fn take_error(&self) -> Option<ConvertError> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Creates a caller-facing handle.
    pub fn handle(self: &Arc<Self>) -> AbortHandle {
        AbortHandle {
            controller: Arc::clone(self),
        }
    }
}

/// Lets a caller stop a conversion at any time, including before it starts.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    controller: Arc<AbortController>,
}

impl AbortHandle {
    /// Stops the conversion. The conversion settles with
    /// [`ConvertError::AbortedByCaller`] unless it already failed.
    pub fn abort(&self) {
        self.controller.abort(ConvertError::AbortedByCaller);
    }

    pub fn is_aborted(&self) -> bool {
        self.controller.is_aborted()
    }
}
