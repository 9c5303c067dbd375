//! Rope-backed text buffer with a render lock and edit notifications.
//!
//! [`Document`] is the host side of the engine: it owns the text, serializes mutations behind a
//! write lock and tells subscribers about every insertion and removal right after it happened,
//! while the write lock is still held. Subscribers therefore must not lock the document from
//! their callback; the post-edit text is handed to them instead.

use crate::changes::{ListenerId, Listeners};
use ropey::Rope;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// Document mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Insertion offset past the end of the document.
    #[error("offset {offset} out of bounds (len {len})")]
    OffsetOutOfBounds {
        /// Requested offset.
        offset: usize,
        /// Document length in characters.
        len: usize,
    },
    /// Removal range past the end of the document.
    #[error("range {start}..{end} out of bounds (len {len})")]
    RangeOutOfBounds {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
        /// Document length in characters.
        len: usize,
    },
}

/// Kind of a document edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Text was inserted.
    Insert,
    /// Text was removed.
    Remove,
}

/// Notification sent to document subscribers after each mutation.
#[derive(Debug, Clone)]
pub struct DocumentEdit {
    /// Insert or remove.
    pub kind: EditKind,
    /// Character offset of the edit.
    pub offset: usize,
    /// Number of inserted or removed characters.
    pub length: usize,
    /// Document text after the edit.
    pub text: Rope,
    /// Document version after the edit.
    pub version: u64,
}

/// Text buffer shared between the editing host and highlight layers.
pub struct Document {
    text: RwLock<Rope>,
    version: AtomicU64,
    edits: Listeners<DocumentEdit>,
}

impl Document {
    /// Create a document holding `text`.
    pub fn new(text: &str) -> Self {
        Self {
            text: RwLock::new(Rope::from_str(text)),
            version: AtomicU64::new(0),
            edits: Listeners::new(),
        }
    }

    /// Length in characters.
    pub fn len_chars(&self) -> usize {
        self.render(Rope::len_chars)
    }

    /// Returns `true` if the document holds no text.
    pub fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Version number, incremented by every effective edit.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Run `f` under the read (render) lock.
    pub fn render<R>(&self, f: impl FnOnce(&Rope) -> R) -> R {
        let text = self.text.read().unwrap_or_else(PoisonError::into_inner);
        f(&text)
    }

    /// Cheap copy of the current text.
    pub fn snapshot(&self) -> Rope {
        self.render(Rope::clone)
    }

    /// Current text as a `String`.
    pub fn text(&self) -> String {
        self.render(Rope::to_string)
    }

    /// Insert `text` at character `offset`.
    pub fn insert(&self, offset: usize, text: &str) -> Result<(), DocumentError> {
        let mut rope = self.text.write().unwrap_or_else(PoisonError::into_inner);
        let len = rope.len_chars();
        if offset > len {
            return Err(DocumentError::OffsetOutOfBounds { offset, len });
        }
        let length = text.chars().count();
        if length == 0 {
            return Ok(());
        }
        rope.insert(offset, text);
        self.notify(EditKind::Insert, offset, length, &rope);
        Ok(())
    }

    /// Remove `length` characters starting at `offset`.
    pub fn remove(&self, offset: usize, length: usize) -> Result<(), DocumentError> {
        let mut rope = self.text.write().unwrap_or_else(PoisonError::into_inner);
        let len = rope.len_chars();
        let end = offset.saturating_add(length);
        if end > len {
            return Err(DocumentError::RangeOutOfBounds {
                start: offset,
                end,
                len,
            });
        }
        if length == 0 {
            return Ok(());
        }
        rope.remove(offset..end);
        self.notify(EditKind::Remove, offset, length, &rope);
        Ok(())
    }

    /// Subscribe to edits.
    ///
    /// The callback runs while the document is write-locked.
    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&DocumentEdit) + Send + Sync + 'static,
    {
        self.edits.subscribe(callback)
    }

    /// Cancel an edit subscription.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.edits.unsubscribe(id)
    }

    fn notify(&self, kind: EditKind, offset: usize, length: usize, rope: &Rope) {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.edits.fire(&DocumentEdit {
            kind,
            offset,
            length,
            text: rope.clone(),
            version,
        });
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("len_chars", &self.len_chars())
            .field("version", &self.version())
            .finish()
    }
}
