use std::io;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SectionId {
    FileHeader,
    SaveHeader,
    Plugins,
    Globals,
    ChangeRecords,
    TemporaryEffects,
    FormIds,
    WorldSpaces,
    /// Bytes after the world space table.
    Tail,
}

impl SectionId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileHeader => "file header",
            Self::SaveHeader => "save header",
            Self::Plugins => "plugins",
            Self::Globals => "globals",
            Self::ChangeRecords => "change records",
            Self::TemporaryEffects => "temporary effects",
            Self::FormIds => "form ids",
            Self::WorldSpaces => "world spaces",
            Self::Tail => "tail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionLayout {
    pub id: SectionId,
    pub range: ByteRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileLayout {
    pub file_len: usize,
    pub sections: Vec<SectionLayout>,
}

impl FileLayout {
    pub fn section(&self, id: SectionId) -> Option<&SectionLayout> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Check that the sections tile the file from byte 0 to `file_len`, in
    /// file order, with no gaps or overlaps.
    pub fn validate(&self) -> io::Result<()> {
        if self.sections.is_empty() {
            return Err(invalid("no sections recorded".to_string()));
        }

        let mut cursor = 0usize;
        let mut previous: Option<SectionId> = None;
        for section in &self.sections {
            let ByteRange { start, end } = section.range;
            if start != cursor {
                return Err(invalid(format!(
                    "{} starts at {start}, previous section ended at {cursor}",
                    section.id.name()
                )));
            }
            if end < start {
                return Err(invalid(format!(
                    "{} ends at {end} before it starts at {start}",
                    section.id.name()
                )));
            }
            if previous.is_some_and(|p| p >= section.id) {
                return Err(invalid(format!(
                    "{} is out of file order",
                    section.id.name()
                )));
            }
            previous = Some(section.id);
            cursor = end;
        }

        if cursor != self.file_len {
            return Err(invalid(format!(
                "sections cover {cursor} of {} bytes",
                self.file_len
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("save layout: {message}"),
    )
}
