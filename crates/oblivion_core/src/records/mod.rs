//! Change-record and created-record decoding.
//!
//! Both decoders are total: malformed or short payloads degrade the record
//! they belong to (see [`DecodeStatus`] and [`DecodeIssue`]) and never abort a
//! scan over the rest of the file.

pub mod change;
pub mod created;
pub mod envelope;
pub mod payload;
pub mod types;

use std::fmt;

use serde::{Serialize, Serializer};

pub use change::{
    Attributes, BaseData, BaseModifier, BookChange, CellChange, ChangeRecord, ChangeRecordData,
    CountedList, CreatedPlacement, CreatureChange, DialogInfoChange, FactionChange,
    FactionRank, FactionReaction, ItemChange, PackageChange, Placement, PlacedCreatureChange,
    QuestChange, QuestStage, RawChangeRecord, Skills, Vec3, decode_change_record,
};
pub use created::{
    CreatedRecord, EffectItem, EnchantmentInfo, FieldData, FieldRecord, ItemData,
    RawCreatedRecord, SpellInfo, decode_created_record,
};
pub use payload::{PayloadReader, Truncated};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecodeStatus {
    Complete,
    Partial,
    Unrecognized,
}

impl DecodeStatus {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Unrecognized => "unrecognized",
        }
    }

    fn from_issues(issues: &[DecodeIssue]) -> Self {
        if issues.iter().any(DecodeIssue::degrades) {
            Self::Partial
        } else {
            Self::Complete
        }
    }
}

impl fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the decoder recovered from while decoding one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecodeIssue {
    UnknownRecordType {
        code: u8,
    },
    UnknownFieldTag {
        #[serde(serialize_with = "serialize_tag")]
        tag: [u8; 4],
    },
    TruncatedPayload {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Bits that were set but ignored because a higher-priority bit won.
    ConflictingFlags {
        flags: u32,
        ignored: u32,
    },
    InvalidString {
        field: &'static str,
    },
}

impl DecodeIssue {
    /// Whether this issue means part of the record could not be represented.
    pub fn degrades(&self) -> bool {
        matches!(self, Self::TruncatedPayload { .. } | Self::InvalidString { .. })
    }
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRecordType { code } => write!(f, "record type {code} is not decoded"),
            Self::UnknownFieldTag { tag } => write!(f, "unknown field tag {}", tag_str(tag)),
            Self::TruncatedPayload {
                field,
                offset,
                needed,
                available,
            } => write!(
                f,
                "{field} truncated at offset {offset}: needed {needed} bytes, {available} available"
            ),
            Self::ConflictingFlags { flags, ignored } => write!(
                f,
                "flags 0x{flags:08x}: ignored 0x{ignored:08x} in favour of a higher-priority bit"
            ),
            Self::InvalidString { field } => write!(f, "{field} is not valid UTF-8"),
        }
    }
}

/// A string field as stored in the save. Invalid UTF-8 keeps the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Text {
    Utf8(String),
    Invalid(Vec<u8>),
}

impl Text {
    /// Decode a string field, dropping a single trailing NUL terminator.
    pub fn decode(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_suffix(&[0u8]).unwrap_or(bytes);
        match std::str::from_utf8(bytes) {
            Ok(s) => Self::Utf8(s.to_string()),
            Err(_) => Self::Invalid(bytes.to_vec()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s),
            Self::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Utf8(_))
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8(s) => f.write_str(s),
            Self::Invalid(bytes) => write!(f, "<invalid utf-8: {} bytes>", bytes.len()),
        }
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Utf8(s) => serializer.serialize_str(s),
            Self::Invalid(bytes) => {
                serializer.serialize_str(&format!("<invalid utf-8 {}>", hex::encode(bytes)))
            }
        }
    }
}

/// Render a 4-byte tag, replacing non-printable bytes with `?`.
pub fn tag_str(tag: &[u8; 4]) -> String {
    tag.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}

pub(crate) fn serialize_tag<S: Serializer>(
    tag: &[u8; 4],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&tag_str(tag))
}

pub(crate) fn serialize_hex<S: Serializer>(
    bytes: &[u8],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

pub(crate) fn serialize_opt_hex<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}
