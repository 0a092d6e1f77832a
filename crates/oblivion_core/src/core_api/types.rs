use serde::{Deserialize, Serialize};

use crate::reader::SystemTime;

/// Player-facing summary of a save, cheap to copy out of a [`super::Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub player_name: String,
    pub level: u16,
    pub cell: String,
    pub save_number: u32,
    pub game_days: f32,
    pub game_ticks: u32,
    /// `major.minor` from the file header.
    pub version: String,
    pub saved_at: SystemTime,
    pub plugin_count: usize,
    pub change_record_count: usize,
    pub created_record_count: usize,
    pub partial_record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordTypeCount {
    pub type_code: u8,
    /// Mnemonic such as `CREA`, or `unknown` for codes outside the type table.
    pub name: String,
    pub count: usize,
}
