//! Shared fixtures for unit tests.

use std::sync::Mutex;

use crate::source::CommandSource;

/// A requester with a fixed permission set that records replies.
#[derive(Debug, Default)]
pub struct TestSource {
    permissions: Vec<String>,
    messages: Mutex<Vec<String>>,
}

impl TestSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permissions(permissions: &[&str]) -> Self {
        Self { permissions: permissions.iter().map(ToString::to_string).collect(), ..Self::default() }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl CommandSource for TestSource {
    fn name(&self) -> &str {
        "test"
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|held| held == permission)
    }

    fn send_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
