//! In-memory notifier that records every message it is asked to deliver.
//!
//! Used by the service and HTTP tests to read back the token id or code a
//! user would have received, and to simulate a failing channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{Notifier, NotifyError};

/// One recorded delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Link { email: String, token_id: String },
    Code { email: String, code: String },
}

impl SentMessage {
    pub fn email(&self) -> &str {
        match self {
            SentMessage::Link { email, .. } | SentMessage::Code { email, .. } => email,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every send is rejected and nothing is recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of everything delivered so far, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    pub fn last_link_for(&self, email: &str) -> Option<String> {
        self.lock().iter().rev().find_map(|m| match m {
            SentMessage::Link { email: to, token_id } if to == email => Some(token_id.clone()),
            _ => None,
        })
    }

    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.lock().iter().rev().find_map(|m| match m {
            SentMessage::Code { email: to, code } if to == email => Some(code.clone()),
            _ => None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SentMessage>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, message: SentMessage) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected(format!(
                "recording notifier is failing (to {})",
                message.email()
            )));
        }
        self.lock().push(message);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_link(&self, email: &str, token_id: &str) -> Result<(), NotifyError> {
        self.record(SentMessage::Link {
            email: email.to_string(),
            token_id: token_id.to_string(),
        })
    }

    async fn send_code(&self, email: &str, code: &str) -> Result<(), NotifyError> {
        self.record(SentMessage::Code {
            email: email.to_string(),
            code: code.to_string(),
        })
    }
}
