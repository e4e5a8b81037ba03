use std::borrow::Cow;

use bytes::Bytes;

/// A single broker message: an opaque payload and an optional partitioning key.
///
/// Fields are private so a message cannot change once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    key: Option<Bytes>,
    value: Bytes,
}

impl Message {
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }

    pub fn with_key(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Payload as text, replacing invalid UTF-8 sequences.
    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}
