use std::io::{self, Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};

/// Windows `SYSTEMTIME`, stored as eight little-endian u16 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemTime {
    pub year: u16,
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub millisecond: u16,
}

pub struct LittleEndianReader<R> {
    inner: R,
}

impl<R: Read + Seek> LittleEndianReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    pub fn read_tag(&mut self) -> io::Result<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u32_vec(&mut self, n: usize) -> io::Result<Vec<u32>> {
        let mut result = Vec::with_capacity(n.min(1 << 16));
        for _ in 0..n {
            result.push(self.read_u32()?);
        }
        Ok(result)
    }

    pub fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let remaining = self.remaining()?;
        if n as u64 > remaining {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("need {n} bytes, only {remaining} left"),
            ));
        }
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a u8-length-prefixed string (`bstring`).
    pub fn read_bstring(&mut self) -> io::Result<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a u8-length-prefixed string whose length includes a trailing NUL
    /// (`bzstring`). The terminator is not part of the returned value.
    pub fn read_bzstring(&mut self) -> io::Result<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read a u16-length-prefixed opaque blob.
    pub fn read_sized_blob(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    pub fn read_system_time(&mut self) -> io::Result<SystemTime> {
        Ok(SystemTime {
            year: self.read_u16()?,
            month: self.read_u16()?,
            day_of_week: self.read_u16()?,
            day: self.read_u16()?,
            hour: self.read_u16()?,
            minute: self.read_u16()?,
            second: self.read_u16()?,
            millisecond: self.read_u16()?,
        })
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn len(&mut self) -> io::Result<u64> {
        let cur = self.position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(cur))?;
        Ok(end)
    }

    pub fn remaining(&mut self) -> io::Result<u64> {
        let cur = self.position()?;
        Ok(self.len()?.saturating_sub(cur))
    }

    pub fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::LittleEndianReader;

    #[test]
    fn bzstring_drops_terminator() {
        let bytes = [4u8, b'B', b'o', b'b', 0];
        let mut r = LittleEndianReader::new(Cursor::new(&bytes[..]));
        assert_eq!(r.read_bzstring().unwrap(), "Bob");
        assert_eq!(r.position().unwrap(), 5);
    }

    #[test]
    fn read_bytes_refuses_to_run_past_end() {
        let bytes = [1u8, 2, 3];
        let mut r = LittleEndianReader::new(Cursor::new(&bytes[..]));
        let err = r.read_bytes(4).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        assert_eq!(r.position().unwrap(), 0);
    }

    #[test]
    fn reads_little_endian_scalars() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x1234u16.to_le_bytes());
        bytes.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        let mut r = LittleEndianReader::new(Cursor::new(bytes));
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert!(r.read_u8().is_err());
    }
}
