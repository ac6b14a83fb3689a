use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub at: DateTime<Local>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: Local::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }
}

/// Message the backend collected before the view was attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreMessage {
    pub kind: NoticeKind,
    pub message: String,
}

impl From<CoreMessage> for Notice {
    fn from(message: CoreMessage) -> Self {
        Notice::new(message.kind, message.message)
    }
}

/// Reconciliation anomaly, recorded instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub device_id: String,
    pub message: String,
    pub at: DateTime<Local>,
}

impl Diagnostic {
    pub fn new(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            message: message.into(),
            at: Local::now(),
        }
    }
}

/// Most-recent-first log that drops its oldest entries past `capacity`.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drain(&mut self) -> Vec<T> {
        self.entries.drain(..).collect()
    }
}
