// The process-wide table of open files. One entry per short name, in
// insertion order; entries are snapshots of the on-disk directory entry
// taken at open time and kept current by the write path.

use crate::dir::DirEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "r" => Some(OpenMode::Read),
            "w" => Some(OpenMode::Write),
            "rw" => Some(OpenMode::ReadWrite),
            _ => None,
        }
    }

    pub fn can_read(self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::ReadWrite)
    }
}

#[derive(Debug, Clone)]
pub struct OpenFile {
    pub entry: DirEntry,
    pub mode: OpenMode,
}

#[derive(Debug, Default)]
pub struct OpenTable {
    files: Vec<OpenFile>,
}

impl OpenTable {
    pub fn new() -> Self {
        OpenTable::default()
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.entry.display_name() == name)
    }

    pub fn insert(&mut self, entry: DirEntry, mode: OpenMode) {
        self.files.push(OpenFile { entry, mode });
    }

    /// Remove the first entry with the given display name.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.files.iter().position(|f| f.entry.display_name() == name) {
            Some(i) => {
                self.files.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut OpenFile> {
        self.files
            .iter_mut()
            .find(|f| f.entry.display_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &[u8; 11]) -> DirEntry {
        DirEntry {
            raw_name: *name,
            attr: 0,
            cluster: 0,
            size: 0,
            write_time: 0,
            write_date: 0,
            entry_loc: 0,
        }
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(OpenMode::parse("r"), Some(OpenMode::Read));
        assert_eq!(OpenMode::parse("w"), Some(OpenMode::Write));
        assert_eq!(OpenMode::parse("rw"), Some(OpenMode::ReadWrite));
        assert_eq!(OpenMode::parse("wr"), None);
        assert!(OpenMode::Read.can_read() && !OpenMode::Read.can_write());
        assert!(OpenMode::Write.can_write() && !OpenMode::Write.can_read());
        assert!(OpenMode::ReadWrite.can_read() && OpenMode::ReadWrite.can_write());
    }

    #[test]
    fn open_close_by_name() {
        let mut table = OpenTable::new();
        table.insert(entry(b"A       TXT"), OpenMode::Read);
        table.insert(entry(b"B       TXT"), OpenMode::Write);
        assert!(table.is_open("a.txt"));
        assert!(table.find_mut("b.txt").is_some());
        assert!(table.remove("a.txt"));
        assert!(!table.is_open("a.txt"));
        assert!(!table.remove("a.txt"));
    }
}
