//! The console requester.

use std::collections::BTreeSet;
use std::io::Write;

use kvk_core::source::CommandSource;

/// Permission that grants every other permission.
pub const WILDCARD_PERMISSION: &str = "*";

/// A requester typing at the terminal. Replies go to stdout.
#[derive(Debug)]
pub struct ConsoleSource {
    name: String,
    permissions: BTreeSet<String>,
}

impl ConsoleSource {
    pub fn new(name: impl Into<String>, permissions: impl IntoIterator<Item = String>) -> Self {
        Self { name: name.into(), permissions: permissions.into_iter().collect() }
    }
}

impl CommandSource for ConsoleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(WILDCARD_PERMISSION) || self.permissions.contains(permission)
    }

    fn send_message(&self, message: &str) {
        let mut stdout = std::io::stdout().lock();
        // a closed stdout only loses the reply
        let _ = writeln!(stdout, "{message}");
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_permissions() {
        let source = ConsoleSource::new("alice", vec!["kvk.admin".to_string()]);
        assert_eq!(source.name(), "alice");
        assert!(source.has_permission("kvk.admin"));
        assert!(!source.has_permission("kvk.other"));
    }

    #[test]
    fn test_wildcard_permission() {
        let source = ConsoleSource::new("root", vec![WILDCARD_PERMISSION.to_string()]);
        assert!(source.has_permission("anything"));
    }
}
