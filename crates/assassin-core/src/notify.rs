use std::fmt;
use std::sync::{Arc, Mutex};

/// Outbound messaging boundary. Delivery is best effort: the death pipeline
/// never treats a failed or impossible send as a precondition.
pub trait NotificationSink {
    /// Direct message to one external account.
    fn notify(&self, account_id: i64, message: &str) -> Result<(), NotifySendError>;

    /// Broadcast to the chat a game is hosted in.
    fn announce(&self, chat_id: i64, message: &str) -> Result<(), NotifySendError>;
}

#[derive(Debug)]
pub struct NotifySendError(pub String);

impl fmt::Display for NotifySendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notification send failed: {}", self.0)
    }
}

impl std::error::Error for NotifySendError {}

/// Swallows everything. Default for headless simulation runs.
#[derive(Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _account_id: i64, _message: &str) -> Result<(), NotifySendError> {
        Ok(())
    }

    fn announce(&self, _chat_id: i64, _message: &str) -> Result<(), NotifySendError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Direct { account_id: i64, message: String },
    Announcement { chat_id: i64, message: String },
}

/// Captures sends for assertions in tests.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<SentMessage> {
        let mut sent = self.sent.lock().expect("buffer sink lock");
        std::mem::take(&mut *sent)
    }
}

impl NotificationSink for BufferSink {
    fn notify(&self, account_id: i64, message: &str) -> Result<(), NotifySendError> {
        self.sent
            .lock()
            .expect("buffer sink lock")
            .push(SentMessage::Direct {
                account_id,
                message: message.to_string(),
            });
        Ok(())
    }

    fn announce(&self, chat_id: i64, message: &str) -> Result<(), NotifySendError> {
        self.sent
            .lock()
            .expect("buffer sink lock")
            .push(SentMessage::Announcement {
                chat_id,
                message: message.to_string(),
            });
        Ok(())
    }
}
