use std::io::{self, Read, Seek};

use serde::Serialize;

use crate::reader::{LittleEndianReader, SystemTime};

pub const MAGIC: &[u8; 12] = b"TES4SAVEGAME";

#[derive(Debug, Clone, Serialize)]
pub struct FileHeader {
    pub major_version: u8,
    pub minor_version: u8,
    /// Build time of the game executable that wrote the save.
    pub exe_time: SystemTime,
}

impl FileHeader {
    pub fn parse<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<Self> {
        let magic = r.read_bytes(MAGIC.len())?;
        if magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid save file signature: expected TES4SAVEGAME",
            ));
        }

        Ok(Self {
            major_version: r.read_u8()?,
            minor_version: r.read_u8()?,
            exe_time: r.read_system_time()?,
        })
    }

    pub fn version(&self) -> String {
        format!("{}.{}", self.major_version, self.minor_version)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveHeader {
    pub header_version: u32,
    pub save_header_size: u32,
    pub save_number: u32,
    pub player_name: String,
    pub player_level: u16,
    pub player_cell: String,
    pub game_days: f32,
    pub game_ticks: u32,
    /// Wall-clock time the save was written.
    pub game_time: SystemTime,
    pub screenshot: Screenshot,
}

impl SaveHeader {
    pub fn parse<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<Self> {
        let header_version = r.read_u32()?;
        let save_header_size = r.read_u32()?;
        let save_number = r.read_u32()?;
        let player_name = r.read_bzstring()?;
        let player_level = r.read_u16()?;
        let player_cell = r.read_bzstring()?;
        let game_days = r.read_f32()?;
        let game_ticks = r.read_u32()?;
        let game_time = r.read_system_time()?;
        let screenshot = Screenshot::parse(r)?;

        Ok(Self {
            header_version,
            save_header_size,
            save_number,
            player_name,
            player_level,
            player_cell,
            game_days,
            game_ticks,
            game_time,
            screenshot,
        })
    }
}

/// Save preview image, 24-bit RGB rows.
#[derive(Debug, Clone, Serialize)]
pub struct Screenshot {
    pub size: u32,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub pixels: Vec<u8>,
}

impl Screenshot {
    pub fn parse<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<Self> {
        let size = r.read_u32()?;
        let width = r.read_u32()?;
        let height = r.read_u32()?;
        let len = usize::try_from(3 * u64::from(width) * u64::from(height)).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("screenshot dimensions {width}x{height} are too large"),
            )
        })?;
        let pixels = r.read_bytes(len)?;

        Ok(Self {
            size,
            width,
            height,
            pixels,
        })
    }
}
