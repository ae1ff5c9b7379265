//! Text normalization and content hashing.
//!
//! The hash covers the normalized primary text and the model identity salt,
//! so either an edit or a model change invalidates a stored vector.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::ModelIdentity;

/// Hex blake3 digest of normalized text plus model salt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash already-normalized text for the given model identity.
    pub fn compute(normalized: &str, identity: &ModelIdentity) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(identity.salt().as_bytes());
        hasher.update(&[0u8]);
        hasher.update(normalized.as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Normalize raw text, then hash it.
    pub fn of_raw(raw: &str, identity: &ModelIdentity) -> Self {
        Self::compute(&normalize_text(raw), identity)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for ContentHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static MEDIA_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\[sound:[^\]]*\]|<img\b[^>]*>|<audio\b[^>]*>.*?</audio>|<video\b[^>]*>.*?</video>")
        .unwrap()
});

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Strip HTML, drop media markers, decode common entities, collapse whitespace.
pub fn normalize_text(raw: &str) -> String {
    let without_media = MEDIA_MARKER.replace_all(raw, " ");
    let without_tags = HTML_TAG.replace_all(&without_media, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
