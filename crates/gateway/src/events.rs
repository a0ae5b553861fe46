use tokio::sync::mpsc;

/// Session lifecycle notifications raised outside any caller's request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A background renewal stored a fresh token.
    Renewed,
    /// A background renewal failed; the stored token has been cleared and the
    /// user must log in again.
    RenewalFailed {
        /// User-facing, localized text for the error dialog.
        message: String,
        /// Diagnostic detail for logs.
        reason: String,
    },
}

/// Receiving end handed to whoever owns navigation.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;
