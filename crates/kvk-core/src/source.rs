//! The requester a command runs on behalf of.

/// Whoever sent a command line.
///
/// The engine only ever asks about permissions. `send_message` is the
/// outbound reply channel executors use to answer the requester.
pub trait CommandSource: Send + Sync {
    /// Display name of the requester, used in logs.
    fn name(&self) -> &str;

    /// Whether the requester holds the given permission.
    fn has_permission(&self, permission: &str) -> bool;

    /// Sends a reply back to the requester.
    fn send_message(&self, message: &str);
}
