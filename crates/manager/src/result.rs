//! Read outcomes
//!
//! Expected outcomes of a read are values, not errors. Backend failures are
//! reported separately through `fs_core::Error`.

use std::fmt;

use fs_core::StatInfo;
use serde::{Deserialize, Serialize};
use storage::ByteStream;

/// Stable integer codes of a read outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ReadCode {
    /// Stream and metadata are available
    Success = 0,

    /// The path failed validation
    InvalidPath = 1,

    /// The path does not exist
    NotFound = 2,

    /// The path is a directory
    InvalidResourceType = 3,

    /// The caller's cached copy is still valid
    NotModified = 4,
}

impl ReadCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadCode::Success => "Success",
            ReadCode::InvalidPath => "InvalidPath",
            ReadCode::NotFound => "NotFound",
            ReadCode::InvalidResourceType => "InvalidResourceType",
            ReadCode::NotModified => "NotModified",
        }
    }
}

impl fmt::Display for ReadCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ReadCode> for u8 {
    fn from(code: ReadCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for ReadCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReadCode::Success),
            1 => Ok(ReadCode::InvalidPath),
            2 => Ok(ReadCode::NotFound),
            3 => Ok(ReadCode::InvalidResourceType),
            4 => Ok(ReadCode::NotModified),
            other => Err(format!("unknown read code {}", other)),
        }
    }
}

/// Outcome of a read request
pub enum ReadResult {
    Success { stream: ByteStream, stat: StatInfo },
    InvalidPath,
    NotFound,
    InvalidResourceType,
    NotModified { stat: StatInfo },
}

impl ReadResult {
    pub fn code(&self) -> ReadCode {
        match self {
            ReadResult::Success { .. } => ReadCode::Success,
            ReadResult::InvalidPath => ReadCode::InvalidPath,
            ReadResult::NotFound => ReadCode::NotFound,
            ReadResult::InvalidResourceType => ReadCode::InvalidResourceType,
            ReadResult::NotModified { .. } => ReadCode::NotModified,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReadResult::Success { .. })
    }

    /// Metadata carried by `Success` and `NotModified`
    pub fn stat(&self) -> Option<&StatInfo> {
        match self {
            ReadResult::Success { stat, .. } | ReadResult::NotModified { stat } => Some(stat),
            _ => None,
        }
    }

    /// Take the content stream of a `Success`
    pub fn into_stream(self) -> Option<ByteStream> {
        match self {
            ReadResult::Success { stream, .. } => Some(stream),
            _ => None,
        }
    }

    /// Split into code, stream and metadata
    pub fn into_parts(self) -> (ReadCode, Option<ByteStream>, Option<StatInfo>) {
        let code = self.code();
        match self {
            ReadResult::Success { stream, stat } => (code, Some(stream), Some(stat)),
            ReadResult::NotModified { stat } => (code, None, Some(stat)),
            _ => (code, None, None),
        }
    }
}

impl fmt::Debug for ReadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadResult")
            .field("code", &self.code())
            .field("stream", &matches!(self, ReadResult::Success { .. }))
            .field("stat", &self.stat())
            .finish()
    }
}
