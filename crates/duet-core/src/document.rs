//! Document payloads

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque document content as stored in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document(Bytes);

impl Document {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self(content.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Vec<u8>> for Document {
    fn from(content: Vec<u8>) -> Self {
        Self(Bytes::from(content))
    }
}

impl From<&'static str> for Document {
    fn from(content: &'static str) -> Self {
        Self(Bytes::from_static(content.as_bytes()))
    }
}

impl From<Bytes> for Document {
    fn from(content: Bytes) -> Self {
        Self(content)
    }
}
