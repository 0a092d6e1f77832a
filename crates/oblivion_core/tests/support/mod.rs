//! Builds synthetic `.ess` files in memory for integration tests.
#![allow(dead_code)]

pub const MAGIC: &[u8; 12] = b"TES4SAVEGAME";

pub struct ChangeEntry {
    pub form_id: u32,
    pub type_code: u8,
    pub flags: u32,
    pub version: u8,
    pub payload: Vec<u8>,
}

pub struct CreatedEntry {
    pub tag: [u8; 4],
    pub form_id: u32,
    pub payload: Vec<u8>,
}

pub struct SaveBuilder {
    pub player_name: String,
    pub level: u16,
    pub cell: String,
    pub save_number: u32,
    pub game_days: f32,
    pub plugins: Vec<String>,
    pub created: Vec<CreatedEntry>,
    pub changes: Vec<ChangeEntry>,
    pub quick_keys: Vec<Option<u32>>,
    pub temporary_effects: Vec<u8>,
    pub form_ids: Vec<u32>,
    pub world_spaces: Vec<u32>,
    pub tail: Vec<u8>,
    /// Write a wrong form id offset into the globals block.
    pub skew_form_ids_offset: bool,
}

impl Default for SaveBuilder {
    fn default() -> Self {
        Self {
            player_name: "Hero".to_string(),
            level: 12,
            cell: "Imperial City Market District".to_string(),
            save_number: 7,
            game_days: 41.5,
            plugins: vec!["Oblivion.esm".to_string()],
            created: Vec::new(),
            changes: Vec::new(),
            quick_keys: vec![None, Some(0xFF00_0001)],
            temporary_effects: vec![0; 4],
            form_ids: vec![0x0000_0014, 0x0001_2345],
            world_spaces: vec![0x0000_003C],
            tail: Vec::new(),
            skew_form_ids_offset: false,
        }
    }
}

impl SaveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change(mut self, form_id: u32, type_code: u8, flags: u32, payload: &[u8]) -> Self {
        self.changes.push(ChangeEntry {
            form_id,
            type_code,
            flags,
            version: 1,
            payload: payload.to_vec(),
        });
        self
    }

    pub fn created(mut self, tag: &[u8; 4], form_id: u32, payload: &[u8]) -> Self {
        self.created.push(CreatedEntry {
            tag: *tag,
            form_id,
            payload: payload.to_vec(),
        });
        self
    }

    pub fn plugin(mut self, name: &str) -> Self {
        self.plugins.push(name.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();

        // File header
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[0, 125]);
        push_system_time(&mut out, [2006, 3, 1, 20, 18, 30, 5, 0]);

        // Save header
        put_u32(&mut out, 125);
        put_u32(&mut out, 0);
        put_u32(&mut out, self.save_number);
        push_bzstring(&mut out, &self.player_name);
        out.extend_from_slice(&self.level.to_le_bytes());
        push_bzstring(&mut out, &self.cell);
        out.extend_from_slice(&self.game_days.to_le_bytes());
        put_u32(&mut out, 3_600_000);
        push_system_time(&mut out, [2024, 5, 3, 17, 21, 4, 9, 250]);
        put_u32(&mut out, 8 + 6);
        put_u32(&mut out, 2);
        put_u32(&mut out, 1);
        out.extend_from_slice(&[10, 20, 30, 40, 50, 60]);

        // Plugins
        out.push(self.plugins.len() as u8);
        for plugin in &self.plugins {
            out.push(plugin.len() as u8);
            out.extend_from_slice(plugin.as_bytes());
        }

        // Globals
        let form_ids_offset_at = out.len();
        put_u32(&mut out, 0);
        put_u32(&mut out, self.changes.len() as u32);
        put_u32(&mut out, 0xFF00_0100);
        put_u32(&mut out, 0x3C);
        put_u32(&mut out, 5);
        put_u32(&mut out, 0xFFFF_FFFE);
        put_u32(&mut out, 0x0001_A2B3);
        for v in [1024.0f32, -512.5, 8.25] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&1u16.to_le_bytes());
        put_u32(&mut out, 0x0000_0039);
        out.extend_from_slice(&3.0f32.to_le_bytes());
        out.extend_from_slice(&(8u16 + 6).to_le_bytes());
        put_u32(&mut out, 1);
        put_u32(&mut out, 0x0002_0001);
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&1234.5f32.to_le_bytes());
        push_blob(&mut out, &[1, 2]);
        push_blob(&mut out, &[]);
        push_blob(&mut out, &[3, 4, 5]);
        put_u32(&mut out, 0);

        put_u32(&mut out, self.created.len() as u32);
        for entry in &self.created {
            out.extend_from_slice(&entry.tag);
            put_u32(&mut out, entry.payload.len() as u32);
            put_u32(&mut out, 0);
            put_u32(&mut out, entry.form_id);
            put_u32(&mut out, 0);
            out.extend_from_slice(&entry.payload);
        }

        let mut keys = Vec::new();
        for key in &self.quick_keys {
            match key {
                Some(iref) => {
                    keys.push(1);
                    keys.extend_from_slice(&iref.to_le_bytes());
                }
                None => keys.push(0),
            }
        }
        push_blob(&mut out, &keys);
        push_blob(&mut out, &[]);
        push_blob(&mut out, &[9]);
        out.extend_from_slice(&10u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        put_u32(&mut out, 0x0000_5001);
        put_u32(&mut out, 6);

        // Change records
        for entry in &self.changes {
            put_u32(&mut out, entry.form_id);
            out.push(entry.type_code);
            put_u32(&mut out, entry.flags);
            out.push(entry.version);
            out.extend_from_slice(&(entry.payload.len() as u16).to_le_bytes());
            out.extend_from_slice(&entry.payload);
        }

        // Temporary effects
        put_u32(&mut out, self.temporary_effects.len() as u32);
        out.extend_from_slice(&self.temporary_effects);

        let mut form_ids_offset = out.len() as u32;
        if self.skew_form_ids_offset {
            form_ids_offset += 3;
        }
        out[form_ids_offset_at..form_ids_offset_at + 4]
            .copy_from_slice(&form_ids_offset.to_le_bytes());

        put_u32(&mut out, self.form_ids.len() as u32);
        for id in &self.form_ids {
            put_u32(&mut out, *id);
        }
        put_u32(&mut out, self.world_spaces.len() as u32);
        for id in &self.world_spaces {
            put_u32(&mut out, *id);
        }

        out.extend_from_slice(&self.tail);
        out
    }
}

/// A created-record field chunk: tag, u16 length, data.
pub fn chunk(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
    out
}

pub fn u32s(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_bzstring(out: &mut Vec<u8>, s: &str) {
    out.push(s.len() as u8 + 1);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

fn push_blob(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

fn push_system_time(out: &mut Vec<u8>, parts: [u16; 8]) {
    for part in parts {
        out.extend_from_slice(&part.to_le_bytes());
    }
}
