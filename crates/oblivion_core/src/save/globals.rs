use std::io::{self, Read, Seek};

use log::debug;
use serde::Serialize;

use crate::reader::LittleEndianReader;
use crate::records::envelope::read_created_record;
use crate::records::{CreatedRecord, serialize_hex};

/// The block between the plugin list and the change records.
#[derive(Debug, Clone, Serialize)]
pub struct Globals {
    /// Absolute file offset of the form ID table.
    pub form_ids_offset: u32,
    pub change_record_count: u32,
    pub next_object_id: u32,
    pub world_id: u32,
    pub world_x: u32,
    pub world_y: u32,
    pub player_location: PlayerLocation,
    pub global_vars: Vec<GlobalVar>,
    pub tes_class_size: u16,
    pub death_counts: Vec<DeathCount>,
    /// Seconds spent in game with no menu open.
    pub game_seconds: f32,
    #[serde(serialize_with = "serialize_hex")]
    pub processes: Vec<u8>,
    #[serde(serialize_with = "serialize_hex")]
    pub spectator_event: Vec<u8>,
    #[serde(serialize_with = "serialize_hex")]
    pub weather: Vec<u8>,
    /// Actors in combat with the player.
    pub player_combat_count: u32,
    pub created_records: Vec<CreatedRecord>,
    pub quick_keys: Vec<QuickKey>,
    #[serde(serialize_with = "serialize_hex")]
    pub reticle: Vec<u8>,
    #[serde(serialize_with = "serialize_hex")]
    pub interface: Vec<u8>,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerLocation {
    pub cell: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalVar {
    pub iref: u32,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeathCount {
    pub actor: u32,
    pub count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuickKey {
    Empty,
    Bound(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub iref: u32,
    pub unknown: u32,
}

impl Globals {
    pub fn parse<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<Self> {
        let form_ids_offset = r.read_u32()?;
        let change_record_count = r.read_u32()?;
        let next_object_id = r.read_u32()?;
        let world_id = r.read_u32()?;
        let world_x = r.read_u32()?;
        let world_y = r.read_u32()?;
        let player_location = PlayerLocation {
            cell: r.read_u32()?,
            x: r.read_f32()?,
            y: r.read_f32()?,
            z: r.read_f32()?,
        };

        let global_count = r.read_u16()?;
        let mut global_vars = Vec::with_capacity(global_count as usize);
        for _ in 0..global_count {
            global_vars.push(GlobalVar {
                iref: r.read_u32()?,
                value: r.read_f32()?,
            });
        }

        let tes_class_size = r.read_u16()?;
        let death_count_len = r.read_u32()?;
        let mut death_counts = Vec::new();
        for _ in 0..death_count_len {
            death_counts.push(DeathCount {
                actor: r.read_u32()?,
                count: r.read_u16()?,
            });
        }

        let game_seconds = r.read_f32()?;
        let processes = r.read_sized_blob()?;
        let spectator_event = r.read_sized_blob()?;
        let weather = r.read_sized_blob()?;
        let player_combat_count = r.read_u32()?;

        let created_count = r.read_u32()?;
        let mut created_records = Vec::new();
        for _ in 0..created_count {
            created_records.push(read_created_record(r)?.decode());
        }
        debug!("read {} created records", created_records.len());

        let quick_keys = parse_quick_keys(r)?;
        let reticle = r.read_sized_blob()?;
        let interface = r.read_sized_blob()?;
        let regions = parse_regions(r)?;

        Ok(Self {
            form_ids_offset,
            change_record_count,
            next_object_id,
            world_id,
            world_x,
            world_y,
            player_location,
            global_vars,
            tes_class_size,
            death_counts,
            game_seconds,
            processes,
            spectator_event,
            weather,
            player_combat_count,
            created_records,
            quick_keys,
            reticle,
            interface,
            regions,
        })
    }
}

/// Entries are one byte when the key is empty and five when it is bound. The
/// u16 size counts entry bytes only.
fn parse_quick_keys<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<Vec<QuickKey>> {
    let size = u64::from(r.read_u16()?);
    let start = r.position()?;
    let mut keys = Vec::new();
    while r.position()? < start + size {
        let flag = r.read_u8()?;
        if flag == 0 {
            keys.push(QuickKey::Empty);
        } else {
            keys.push(QuickKey::Bound(r.read_u32()?));
        }
    }
    Ok(keys)
}

fn parse_regions<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<Vec<Region>> {
    let _size = r.read_u16()?;
    let count = r.read_u16()?;
    let mut regions = Vec::with_capacity(count as usize);
    for _ in 0..count {
        regions.push(Region {
            iref: r.read_u32()?,
            unknown: r.read_u32()?,
        });
    }
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn quick_keys_mix_empty_and_bound() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7u16.to_le_bytes());
        bytes.push(0);
        bytes.push(1);
        bytes.extend_from_slice(&0x0001_2345u32.to_le_bytes());
        bytes.push(0);
        bytes.push(0xEE);

        let mut r = LittleEndianReader::new(Cursor::new(bytes));
        let keys = parse_quick_keys(&mut r).unwrap();
        assert_eq!(
            keys,
            vec![QuickKey::Empty, QuickKey::Bound(0x0001_2345), QuickKey::Empty]
        );
        assert_eq!(r.read_u8().unwrap(), 0xEE);
    }

    #[test]
    fn regions_ignore_size_field() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xFFFFu16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0x10u32.to_le_bytes());
        bytes.extend_from_slice(&0x20u32.to_le_bytes());

        let mut r = LittleEndianReader::new(Cursor::new(bytes));
        let regions = parse_regions(&mut r).unwrap();
        assert_eq!(
            regions,
            vec![Region {
                iref: 0x10,
                unknown: 0x20
            }]
        );
    }
}
