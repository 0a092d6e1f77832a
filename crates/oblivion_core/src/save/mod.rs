pub mod globals;
pub mod header;

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Seek};

use log::{info, warn};

use crate::layout::{ByteRange, FileLayout, SectionId, SectionLayout};
use crate::reader::LittleEndianReader;
use crate::records::envelope::read_change_record;
use crate::records::{ChangeRecord, DecodeStatus};
pub use globals::{DeathCount, GlobalVar, Globals, PlayerLocation, QuickKey, Region};
pub use header::{FileHeader, SaveHeader, Screenshot};

#[derive(Debug)]
pub struct SaveGame {
    pub file_header: FileHeader,
    pub header: SaveHeader,
    pub plugins: Vec<String>,
    pub globals: Globals,
    /// In file order.
    pub change_records: Vec<ChangeRecord>,
    pub temporary_effects: Vec<u8>,
    pub form_ids: Vec<u32>,
    pub world_spaces: Vec<u32>,
}

#[derive(Debug)]
pub struct Document {
    pub save: SaveGame,
    layout: FileLayout,
}

#[derive(Default)]
struct Capture {
    sections: Vec<SectionLayout>,
}

impl Capture {
    fn record(&mut self, id: SectionId, start: usize, end: usize) {
        self.sections.push(SectionLayout {
            id,
            range: ByteRange { start, end },
        });
    }
}

impl SaveGame {
    pub fn parse<R: Read + Seek>(reader: R) -> io::Result<Self> {
        let mut r = LittleEndianReader::new(reader);
        parse_internal(&mut r, None)
    }

    /// Number of change records per type code, ordered by code.
    pub fn change_record_counts(&self) -> Vec<(u8, usize)> {
        let mut counts = BTreeMap::new();
        for record in &self.change_records {
            *counts.entry(record.type_code).or_insert(0usize) += 1;
        }
        counts.into_iter().collect()
    }

    /// Change records that were cut short or held undecodable strings.
    pub fn partial_record_count(&self) -> usize {
        self.change_records
            .iter()
            .filter(|r| r.status == DecodeStatus::Partial)
            .count()
    }

    pub fn find_change_record(&self, form_id: u32) -> Option<&ChangeRecord> {
        self.change_records.iter().find(|r| r.form_id == form_id)
    }
}

impl Document {
    pub fn parse_with_layout<R: Read + Seek>(mut reader: R) -> io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut capture = Capture::default();
        let mut r = LittleEndianReader::new(Cursor::new(bytes.as_slice()));
        let save = parse_internal(&mut r, Some(&mut capture))?;

        let consumed = r.position()? as usize;
        let file_len = bytes.len();
        if consumed < file_len {
            warn!("{} bytes after the world space table", file_len - consumed);
            capture.record(SectionId::Tail, consumed, file_len);
        }

        let layout = FileLayout {
            file_len,
            sections: capture.sections,
        };
        layout.validate()?;

        Ok(Self { save, layout })
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }
}

/// Run `parse` and record the bytes it consumed as section `id`.
fn section<R, T>(
    r: &mut LittleEndianReader<R>,
    capture: &mut Option<&mut Capture>,
    id: SectionId,
    parse: impl FnOnce(&mut LittleEndianReader<R>) -> io::Result<T>,
) -> io::Result<T>
where
    R: Read + Seek,
{
    let start = r.position()? as usize;
    let value = parse(r)?;
    let end = r.position()? as usize;
    info!("{} at {start}..{end}", id.name());
    if let Some(c) = capture.as_deref_mut() {
        c.record(id, start, end);
    }
    Ok(value)
}

fn parse_internal<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    mut capture: Option<&mut Capture>,
) -> io::Result<SaveGame> {
    let file_header = section(r, &mut capture, SectionId::FileHeader, FileHeader::parse)?;
    let header = section(r, &mut capture, SectionId::SaveHeader, SaveHeader::parse)?;
    let plugins = section(r, &mut capture, SectionId::Plugins, parse_plugins)?;
    let globals = section(r, &mut capture, SectionId::Globals, Globals::parse)?;

    let record_count = globals.change_record_count;
    let change_records = section(r, &mut capture, SectionId::ChangeRecords, |r| {
        parse_change_records(r, record_count)
    })?;

    let temporary_effects = section(r, &mut capture, SectionId::TemporaryEffects, |r| {
        let size = r.read_u32()? as usize;
        r.read_bytes(size)
    })?;

    let form_ids_at = r.position()?;
    if form_ids_at != u64::from(globals.form_ids_offset) {
        warn!(
            "form id table at offset {form_ids_at}, globals point to {}",
            globals.form_ids_offset
        );
    }
    let form_ids = section(r, &mut capture, SectionId::FormIds, read_counted_u32s)?;
    let world_spaces = section(r, &mut capture, SectionId::WorldSpaces, read_counted_u32s)?;

    Ok(SaveGame {
        file_header,
        header,
        plugins,
        globals,
        change_records,
        temporary_effects,
        form_ids,
        world_spaces,
    })
}

fn parse_plugins<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<Vec<String>> {
    let count = r.read_u8()?;
    let mut plugins = Vec::with_capacity(count as usize);
    for _ in 0..count {
        plugins.push(r.read_bstring()?);
    }
    Ok(plugins)
}

fn parse_change_records<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    count: u32,
) -> io::Result<Vec<ChangeRecord>> {
    let mut records = Vec::new();
    for index in 0..count {
        let raw = read_change_record(r).map_err(|e| {
            io::Error::new(e.kind(), format!("change record {index} of {count}: {e}"))
        })?;
        records.push(raw.decode());
    }
    Ok(records)
}

fn read_counted_u32s<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<Vec<u32>> {
    let count = r.read_u32()? as usize;
    let remaining = r.remaining()?;
    if count as u64 * 4 > remaining {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("table of {count} form ids needs {} bytes, {remaining} left", count * 4),
        ));
    }
    r.read_u32_vec(count)
}
