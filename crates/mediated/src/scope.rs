use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A cancellation token owned by exactly one dispatch.
///
/// The token is cancelled when the scope is dropped, so a handler that kept a clone of it sees
/// the dispatch as finished. Scopes opened under a parent token are cancelled together with it,
/// releasing a scope never touches the parent.
pub struct CancelScope {
    token: CancellationToken,
}

impl CancelScope {
    pub fn open(parent: Option<&CancellationToken>) -> Self {
        let token = parent.map_or_else(CancellationToken::new, CancellationToken::child_token);
        trace!(parent = parent.is_some(), "cancel scope opened");
        Self { token }
    }

    /// A handle to hand to the dispatcher
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        self.token.cancel();
        trace!("cancel scope released");
    }
}

impl fmt::Debug for CancelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelScope").field("cancelled", &self.token.is_cancelled()).finish()
    }
}
