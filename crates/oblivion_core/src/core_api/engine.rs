use std::io::Cursor;
use std::path::Path;

use crate::layout::FileLayout;
use crate::records::types::{change_record_type_code, change_record_type_name};
use crate::records::{ChangeRecord, CreatedRecord};
use crate::save::{Document, SaveGame};

use super::error::{CoreError, CoreErrorCode};
use super::types::{RecordTypeCount, Snapshot};

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

#[derive(Debug)]
pub struct Session {
    snapshot: Snapshot,
    document: Box<Document>,
}

impl Engine {
    pub fn new() -> Self {
        Self
    }

    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, CoreError> {
        Document::parse_with_layout(Cursor::new(bytes.as_ref()))
            .map(session_from_document)
            .map_err(|e| {
                CoreError::from_io(CoreErrorCode::Parse, "failed to parse Oblivion save", &e)
            })
    }

    pub fn open_path<P: AsRef<Path>>(&self, path: P) -> Result<Session, CoreError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            CoreError::from_io(
                CoreErrorCode::Io,
                &format!("failed to read {}", path.display()),
                &e,
            )
        })?;
        self.open_bytes(bytes)
    }
}

impl Session {
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn save(&self) -> &SaveGame {
        &self.document.save
    }

    pub fn layout(&self) -> &FileLayout {
        self.document.layout()
    }

    pub fn plugins(&self) -> &[String] {
        &self.document.save.plugins
    }

    pub fn change_records(&self) -> &[ChangeRecord] {
        &self.document.save.change_records
    }

    /// Change records whose type mnemonic matches `name` (case-insensitive).
    pub fn change_records_of(&self, name: &str) -> Result<Vec<&ChangeRecord>, CoreError> {
        let code = change_record_type_code(name).ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::UnsupportedOperation,
                format!("'{name}' is not a change record type"),
            )
        })?;
        Ok(self
            .change_records()
            .iter()
            .filter(|r| r.type_code == code)
            .collect())
    }

    pub fn find_change_record(&self, form_id: u32) -> Option<&ChangeRecord> {
        self.document.save.find_change_record(form_id)
    }

    pub fn created_records(&self) -> &[CreatedRecord] {
        &self.document.save.globals.created_records
    }

    pub fn record_type_counts(&self) -> Vec<RecordTypeCount> {
        self.document
            .save
            .change_record_counts()
            .into_iter()
            .map(|(type_code, count)| RecordTypeCount {
                type_code,
                name: change_record_type_name(type_code)
                    .unwrap_or("unknown")
                    .to_string(),
                count,
            })
            .collect()
    }
}

fn session_from_document(doc: Document) -> Session {
    let save = &doc.save;
    let snapshot = Snapshot {
        player_name: save.header.player_name.clone(),
        level: save.header.player_level,
        cell: save.header.player_cell.clone(),
        save_number: save.header.save_number,
        game_days: save.header.game_days,
        game_ticks: save.header.game_ticks,
        version: save.file_header.version(),
        saved_at: save.header.game_time,
        plugin_count: save.plugins.len(),
        change_record_count: save.change_records.len(),
        created_record_count: save.globals.created_records.len(),
        partial_record_count: save.partial_record_count(),
    };

    Session {
        snapshot,
        document: Box::new(doc),
    }
}
