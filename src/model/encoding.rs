//! Text encoding of byte payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Encoding declared on a node for its byte payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "ascii")]
    Ascii,
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "iso-8859-1",
        }
    }

    /// Best guess for raw bytes: pure ASCII, then UTF-8, else Latin-1
    /// (every byte sequence is valid Latin-1).
    pub fn detect(bytes: &[u8]) -> Encoding {
        if bytes.is_ascii() {
            Encoding::Ascii
        } else if std::str::from_utf8(bytes).is_ok() {
            Encoding::Utf8
        } else {
            Encoding::Latin1
        }
    }

    /// Whether bytes detected as `detected` can be decoded under `self`.
    /// ASCII is a subset of every supported encoding.
    pub fn accepts(&self, detected: Encoding) -> bool {
        *self == detected || detected == Encoding::Ascii
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Ascii | Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "iso-8859-1" | "latin-1" | "latin1" => Ok(Encoding::Latin1),
            _ => Err(Error::UnknownEncoding(s.to_owned())),
        }
    }
}
