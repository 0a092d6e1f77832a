use std::io::{self, Read, Seek};

use crate::reader::LittleEndianReader;

use super::change::RawChangeRecord;
use super::created::RawCreatedRecord;

/// Bytes before the payload of a change record.
pub const CHANGE_HEADER_LEN: usize = 12;
/// Bytes before the payload of a created record.
pub const CREATED_HEADER_LEN: usize = 20;

/// Read one change record envelope. The reader is left at the first byte of
/// the next record regardless of how the payload later decodes.
pub fn read_change_record<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
) -> io::Result<RawChangeRecord> {
    let form_id = r.read_u32()?;
    let type_code = r.read_u8()?;
    let flags = r.read_u32()?;
    let version = r.read_u8()?;
    let size = r.read_u16()? as usize;
    let payload = r.read_bytes(size).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("change record {form_id:08x} (type {type_code}, {size} bytes): {e}"),
        )
    })?;

    Ok(RawChangeRecord {
        form_id,
        type_code,
        flags,
        version,
        payload,
    })
}

pub fn read_created_record<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
) -> io::Result<RawCreatedRecord> {
    let type_tag = r.read_tag()?;
    let size = r.read_u32()?;
    let flags = r.read_u32()?;
    let form_id = r.read_u32()?;
    let version_info = r.read_u32()?;
    let payload = r.read_bytes(size as usize).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("created record {form_id:08x} ({size} bytes): {e}"),
        )
    })?;

    Ok(RawCreatedRecord {
        type_tag,
        size,
        flags,
        form_id,
        version_info,
        payload,
    })
}
