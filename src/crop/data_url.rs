/// Inline image payloads
///
/// Images travel between the file reader, the cropper and the API as
/// `data:<mime>;base64,<payload>` strings. This module parses and builds them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ImageError;

/// A parsed base64 data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime: String,
    bytes: Vec<u8>,
}

impl DataUrl {
    /// Wrap raw bytes with a MIME type
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Decoded payload bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Size of the decoded payload in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decoded size of a data URL string, without decoding it.
    ///
    /// Used to reject oversized uploads before allocating the payload.
    pub fn decoded_len_hint(url: &str) -> Option<usize> {
        let (_, payload) = url.split_once(',')?;
        let padding = payload.bytes().rev().take_while(|&b| b == b'=').count();
        Some((payload.len() / 4 * 3).saturating_sub(padding))
    }
}

impl FromStr for DataUrl {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("data:")
            .ok_or(ImageError::InvalidDataUrl("missing data: scheme"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or(ImageError::InvalidDataUrl("missing payload separator"))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(ImageError::InvalidDataUrl("payload is not base64"))?;

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| ImageError::InvalidDataUrl("payload is not valid base64"))?;

        Ok(Self {
            mime: if mime.is_empty() {
                "text/plain".to_string()
            } else {
                mime.to_ascii_lowercase()
            },
            bytes,
        })
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

// Sessions serialize images in their wire form
impl Serialize for DataUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
