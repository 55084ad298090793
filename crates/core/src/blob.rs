//! Opaque payloads
//!
//! Event batches, version histories and similar payloads are never
//! interpreted by the persistence layer. They travel as bytes plus the
//! encoding tag the producer used.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Encoding tag of a [`DataBlob`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingType {
    /// Thrift binary encoding
    ThriftRw,
    /// JSON text
    Json,
    /// Protocol buffers v3
    Proto3,
}

impl EncodingType {
    /// Stable textual form stored alongside the bytes
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingType::ThriftRw => "thriftrw",
            EncodingType::Json => "json",
            EncodingType::Proto3 => "proto3",
        }
    }
}

impl FromStr for EncodingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thriftrw" => Ok(EncodingType::ThriftRw),
            "json" => Ok(EncodingType::Json),
            "proto3" => Ok(EncodingType::Proto3),
            other => Err(format!("unknown encoding type {:?}", other)),
        }
    }
}

impl std::fmt::Display for EncodingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes plus their encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBlob {
    /// How `data` was encoded
    pub encoding: EncodingType,
    /// Encoded payload
    pub data: Vec<u8>,
}

impl DataBlob {
    /// Create a blob
    pub fn new(encoding: EncodingType, data: impl Into<Vec<u8>>) -> Self {
        Self {
            encoding,
            data: data.into(),
        }
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
