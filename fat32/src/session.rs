// The command surface. A session owns the mounted volume, the current
// working directory, its cached display path, and the open-file table;
// each user command is one method. Data output goes to the supplied
// writer; failures are typed and reported by the caller.

use crate::constants::*;
use crate::dir::{encode_short_name, DirEntry};
use crate::open_table::{OpenMode, OpenTable};
use crate::path;
use crate::volume::Volume;
use fatshell_core::{FatshellError, Result};
use log::debug;
use std::io::Write;

/// Every command name, in the order `help` lists them.
pub const COMMANDS: &[&str] = &[
    "cd", "close", "create", "fsinfo", "help", "ls", "mkdir", "open", "read", "rm", "rmdir",
    "size", "undelete", "write",
];

const USAGE_FSINFO: &str = "usage: fsinfo";
const USAGE_LS: &str = "usage: ls [directory_name]";
const USAGE_CD: &str = "usage: cd [directory_name]";
const USAGE_SIZE: &str = "usage: size <entry_name>";
const USAGE_OPEN: &str = "usage: open <file_name> <mode>";
const USAGE_CLOSE: &str = "usage: close <file_name>";
const USAGE_READ: &str = "usage: read <file_name> <start> <num_bytes>";
const USAGE_WRITE: &str = "usage: write <file_name> <start> <quoted_data>";
const USAGE_MKDIR: &str = "usage: mkdir <dir_name>";
const USAGE_CREATE: &str = "usage: create <file_name>";
const USAGE_RM: &str = "usage: rm <file_name>...";
const USAGE_RMDIR: &str = "usage: rmdir <dir_name>";
const USAGE_UNDELETE: &str = "usage: undelete";

pub struct Session {
    volume: Volume,
    cwd: u32,
    location: String,
    open_table: OpenTable,
}

impl Session {
    pub fn new(volume: Volume) -> Self {
        let cwd = volume.geometry().root_cluster;
        Session {
            volume,
            cwd,
            location: "/".to_string(),
            open_table: OpenTable::new(),
        }
    }

    /// Display path of the current working directory, for the prompt.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn volume_mut(&mut self) -> &mut Volume {
        &mut self.volume
    }

    /// Run one command. Unknown names fail with `UnknownCommand` so the
    /// caller can tell a bad command apart from a failed one.
    pub fn dispatch(&mut self, name: &str, args: &[String], out: &mut dyn Write) -> Result<()> {
        debug!("command: {} {:?}", name, args);
        match name {
            "fsinfo" => self.cmd_fsinfo(args, out),
            "ls" => self.cmd_ls(args, out),
            "cd" => self.cmd_cd(args),
            "size" => self.cmd_size(args, out),
            "open" => self.cmd_open(args),
            "close" => self.cmd_close(args),
            "read" => self.cmd_read(args, out),
            "write" => self.cmd_write(args),
            "mkdir" => self.cmd_mkdir(args),
            "create" => self.cmd_create(args),
            "rm" => self.cmd_rm(args),
            "rmdir" => self.cmd_rmdir(args),
            "undelete" => self.cmd_undelete(args),
            "help" => self.cmd_help(args, out),
            _ => Err(FatshellError::UnknownCommand(name.to_string())),
        }
    }

    fn cmd_fsinfo(&mut self, args: &[String], out: &mut dyn Write) -> Result<()> {
        if !args.is_empty() {
            return Err(FatshellError::Usage(USAGE_FSINFO));
        }
        let free_sectors =
            self.volume.free_count()? as u64 * self.volume.geometry().sectors_per_cluster as u64;
        let g = self.volume.geometry();
        writeln!(out, "  Bytes Per Sector:       {}", g.bytes_per_sector)?;
        writeln!(out, "  Sectors Per Cluster:    {}", g.sectors_per_cluster)?;
        writeln!(out, "  Total Sectors:          {}", g.total_sectors)?;
        writeln!(out, "  Number of FATs:         {}", g.num_fats)?;
        writeln!(out, "  Sectors Per Fat:        {}", g.fat_size)?;
        writeln!(out, "  Number of Free Sectors: {}", free_sectors)?;
        Ok(())
    }

    fn cmd_ls(&mut self, args: &[String], out: &mut dyn Write) -> Result<()> {
        let target = match args {
            [] => ".",
            [path] => path.as_str(),
            _ => return Err(FatshellError::Usage(USAGE_LS)),
        };
        let segments = path::parse(target);
        let cluster = self.volume.navigate(&segments, self.cwd)?;
        if cluster == 0 {
            return Ok(());
        }
        let entries = self.volume.list_dir(cluster, false)?;
        for entry in &entries {
            write!(out, "{} ", entry.display_name())?;
        }
        if !entries.is_empty() {
            writeln!(out)?;
        }
        Ok(())
    }

    fn cmd_cd(&mut self, args: &[String]) -> Result<()> {
        let target = match args {
            [] => "/",
            [path] => path.as_str(),
            _ => return Err(FatshellError::Usage(USAGE_CD)),
        };
        let segments = path::parse(target);
        let cluster = self.volume.navigate(&segments, self.cwd)?;
        let location = self.volume.path_name(cluster)?;
        self.cwd = cluster;
        self.location = location;
        Ok(())
    }

    fn cmd_size(&mut self, args: &[String], out: &mut dyn Write) -> Result<()> {
        let [target] = args else {
            return Err(FatshellError::Usage(USAGE_SIZE));
        };
        let segments = path::parse(target);
        let Some(name) = segments.last() else {
            return Err(FatshellError::Usage(USAGE_SIZE));
        };
        let parent = self
            .volume
            .navigate(&segments[..segments.len() - 1], self.cwd)?;
        let entries = self.volume.list_dir(parent, false)?;
        let entry = entries
            .iter()
            .find(|e| e.display_name() == *name)
            .ok_or_else(|| FatshellError::NotFound(name.clone()))?;

        // Chain hops, not the recorded byte size: the reported value is the
        // allocation the chain covers, rounded to whole clusters.
        let mut current = entry.cluster;
        let mut count = 0u64;
        loop {
            current = self.volume.next_cluster(current)?;
            count += 1;
            if current >= FAT_EOC {
                break;
            }
        }
        writeln!(
            out,
            "{}",
            count * self.volume.geometry().bytes_per_cluster() as u64
        )?;
        Ok(())
    }

    fn cmd_open(&mut self, args: &[String]) -> Result<()> {
        let [name, mode] = args else {
            return Err(FatshellError::Usage(USAGE_OPEN));
        };
        let name = name.to_ascii_lowercase();
        let mode = OpenMode::parse(mode)
            .ok_or_else(|| FatshellError::InvalidMode(mode.clone()))?;
        if self.open_table.is_open(&name) {
            return Err(FatshellError::AlreadyOpen(name));
        }
        let entries = self.volume.list_dir(self.cwd, false)?;
        let entry = entries
            .into_iter()
            .find(|e| e.display_name() == name)
            .ok_or_else(|| FatshellError::NotFound(name.clone()))?;
        if entry.is_directory() {
            return Err(FatshellError::IsDirectory(name));
        }
        self.open_table.insert(entry, mode);
        Ok(())
    }

    fn cmd_close(&mut self, args: &[String]) -> Result<()> {
        let [name] = args else {
            return Err(FatshellError::Usage(USAGE_CLOSE));
        };
        let name = name.to_ascii_lowercase();
        if !self.open_table.remove(&name) {
            return Err(FatshellError::NotOpen(name));
        }
        Ok(())
    }

    fn cmd_read(&mut self, args: &[String], out: &mut dyn Write) -> Result<()> {
        let [name, start, length] = args else {
            return Err(FatshellError::Usage(USAGE_READ));
        };
        let name = name.to_ascii_lowercase();
        let head = {
            let file = self
                .open_table
                .find_mut(&name)
                .ok_or_else(|| FatshellError::NotOpen(name.clone()))?;
            if !file.mode.can_read() {
                return Err(FatshellError::PermissionDenied("reading"));
            }
            file.entry.cluster
        };
        let start: u32 = start
            .parse()
            .map_err(|_| FatshellError::Usage(USAGE_READ))?;
        let length: u32 = length
            .parse()
            .map_err(|_| FatshellError::Usage(USAGE_READ))?;

        let data = self.volume.read_span(head, start, length)?;
        out.write_all(&data)?;
        Ok(())
    }

    fn cmd_write(&mut self, args: &[String]) -> Result<()> {
        let [name, start, data] = args else {
            return Err(FatshellError::Usage(USAGE_WRITE));
        };
        let name = name.to_ascii_lowercase();
        let mut entry = {
            let file = self
                .open_table
                .find_mut(&name)
                .ok_or_else(|| FatshellError::NotOpen(name.clone()))?;
            if !file.mode.can_write() {
                return Err(FatshellError::PermissionDenied("writing"));
            }
            file.entry.clone()
        };
        let start: u32 = start
            .parse()
            .map_err(|_| FatshellError::Usage(USAGE_WRITE))?;
        let data = data.as_bytes();

        let total = start
            .checked_add(data.len() as u32)
            .ok_or(FatshellError::StartOutOfBounds)?;
        let bytes_per_cluster = self.volume.geometry().bytes_per_cluster();

        // Make sure the chain covers `total` bytes before writing: a file
        // with no chain gets its first cluster, a short one is extended by
        // whole clusters appended at the tail.
        let (allocated, mut tail) = if entry.cluster == 0 {
            let head = self.volume.allocate(0)?;
            entry.cluster = head;
            entry.size = total;
            self.volume.save_entry(&mut entry)?;
            (bytes_per_cluster, head)
        } else {
            let (count, tail) = self.volume.chain_info(entry.cluster)?;
            (count * bytes_per_cluster, tail)
        };
        if total > allocated {
            let needed = (total - allocated).div_ceil(bytes_per_cluster);
            for _ in 0..needed {
                tail = self.volume.allocate(tail)?;
            }
        }
        if entry.size < total {
            entry.size = total;
            self.volume.save_entry(&mut entry)?;
        }

        let written = self.volume.write_span(entry.cluster, start, data)?;
        debug!("wrote {} bytes to {} at offset {}", written, name, start);

        // Keep the open-table snapshot current.
        if let Some(file) = self.open_table.find_mut(&name) {
            file.entry = entry;
        }
        Ok(())
    }

    fn cmd_mkdir(&mut self, args: &[String]) -> Result<()> {
        let [target] = args else {
            return Err(FatshellError::Usage(USAGE_MKDIR));
        };
        let segments = path::parse(target);
        let Some(name) = segments.last() else {
            return Err(FatshellError::Usage(USAGE_MKDIR));
        };
        let parent = self
            .volume
            .navigate(&segments[..segments.len() - 1], self.cwd)?;
        let raw_name = encode_short_name(name)?;

        let mut entry = self.volume.add_entry(parent, raw_name, ATTR_DIRECTORY)?;
        let cluster = self.volume.allocate(0)?;
        entry.cluster = cluster;
        self.volume.save_entry(&mut entry)?;

        // The fresh cluster is zeroed, so the dot entries go in the first
        // two slots. Root's children record their parent as cluster 0.
        let root = self.volume.geometry().root_cluster;
        let base = self.volume.geometry().cluster_byte(cluster);
        let mut dot = DirEntry {
            raw_name: *b".          ",
            attr: ATTR_DIRECTORY,
            cluster,
            size: 0,
            write_time: 0,
            write_date: 0,
            entry_loc: base,
        };
        self.volume.save_entry(&mut dot)?;
        let mut dotdot = DirEntry {
            raw_name: *b"..         ",
            attr: ATTR_DIRECTORY,
            cluster: if parent == root { 0 } else { parent },
            size: 0,
            write_time: 0,
            write_date: 0,
            entry_loc: base + DIR_ENTRY_SIZE,
        };
        self.volume.save_entry(&mut dotdot)?;
        Ok(())
    }

    fn cmd_create(&mut self, args: &[String]) -> Result<()> {
        let [target] = args else {
            return Err(FatshellError::Usage(USAGE_CREATE));
        };
        let segments = path::parse(target);
        let Some(name) = segments.last() else {
            return Err(FatshellError::Usage(USAGE_CREATE));
        };
        let parent = self
            .volume
            .navigate(&segments[..segments.len() - 1], self.cwd)?;
        let raw_name = encode_short_name(name)?;
        let mut entry = self.volume.add_entry(parent, raw_name, 0)?;
        self.volume.save_entry(&mut entry)?;
        Ok(())
    }

    fn cmd_rm(&mut self, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(FatshellError::Usage(USAGE_RM));
        }
        for raw in args {
            let name = raw.to_ascii_lowercase();
            if self.open_table.is_open(&name) {
                self.open_table.remove(&name);
            }
            let entries = self.volume.list_dir(self.cwd, false)?;
            let mut entry = entries
                .into_iter()
                .find(|e| !e.is_directory() && e.display_name() == name)
                .ok_or_else(|| FatshellError::NotFound(name.clone()))?;

            if entry.cluster != 0 {
                self.volume.free_chain(entry.cluster)?;
            }
            // Only the first name byte changes; the rest of the entry stays
            // recoverable for undelete.
            entry.raw_name[0] = DIR_TOMBSTONE;
            self.volume.save_entry(&mut entry)?;
        }
        Ok(())
    }

    fn cmd_rmdir(&mut self, args: &[String]) -> Result<()> {
        let [target] = args else {
            return Err(FatshellError::Usage(USAGE_RMDIR));
        };
        let name = target.to_ascii_lowercase();
        if name.starts_with('.') {
            return Err(FatshellError::NameInvalid(name));
        }
        let entries = self.volume.list_dir(self.cwd, false)?;
        let mut entry = entries
            .into_iter()
            .find(|e| e.is_directory() && e.display_name() == name)
            .ok_or_else(|| FatshellError::NotFound(name.clone()))?;

        let listing = self.volume.list_dir(entry.cluster, false)?;
        if listing.len() > 2 {
            return Err(FatshellError::NotEmpty);
        }

        entry.raw_name[0] = DIR_TOMBSTONE;
        self.volume.save_entry(&mut entry)?;
        if entry.cluster != 0 {
            self.volume.free_chain(entry.cluster)?;
        }
        Ok(())
    }

    /// Best-effort recovery of tombstoned entries in the current directory.
    /// The FAT is scanned forward from each entry's stored head cluster for
    /// free entries, which are relinked into a chain of the original
    /// length. Data may have been overwritten since deletion; this restores
    /// structure, not necessarily content.
    fn cmd_undelete(&mut self, args: &[String]) -> Result<()> {
        if !args.is_empty() {
            return Err(FatshellError::Usage(USAGE_UNDELETE));
        }
        const MAX_RECOVERED: u32 = 99;

        let mut count = self
            .volume
            .list_dir(self.cwd, false)?
            .iter()
            .filter(|e| e.display_name().starts_with("recvd_"))
            .count() as u32;
        if count > MAX_RECOVERED {
            return Ok(());
        }

        let bytes_per_cluster = self.volume.geometry().bytes_per_cluster();
        let end_of_fat = self.volume.geometry().end_of_fat;

        for mut entry in self.volume.list_dir(self.cwd, true)? {
            if entry.raw_name[0] != DIR_TOMBSTONE {
                continue;
            }
            let cluster_count = if entry.is_directory() {
                1
            } else {
                entry.size.div_ceil(bytes_per_cluster)
            };

            if entry.cluster != 0 {
                let Some(head) = self.scan_free(entry.cluster, end_of_fat)? else {
                    continue;
                };
                entry.cluster = head;

                let mut current = head;
                let mut next = head + 1;
                'relink: for i in 0..cluster_count {
                    if i + 1 == cluster_count {
                        self.volume.set_next_cluster(current, FAT_MASK)?;
                        let free = self.volume.free_count()?;
                        self.volume.set_free_count(free.saturating_sub(1))?;
                    } else {
                        match self.scan_free(next, end_of_fat)? {
                            Some(found) => {
                                self.volume.set_next_cluster(current, found)?;
                                let free = self.volume.free_count()?;
                                self.volume.set_free_count(free.saturating_sub(1))?;
                                current = found;
                                next = found + 1;
                            }
                            // Ran off the FAT mid-chain: keep what was
                            // linked and still surface the entry.
                            None => break 'relink,
                        }
                    }
                }
            }

            count += 1;
            let label = format!("RECVD_{}", count);
            let mut raw_name = [b' '; 11];
            raw_name[..label.len()].copy_from_slice(label.as_bytes());
            entry.raw_name = raw_name;
            self.volume.save_entry(&mut entry)?;

            if count >= MAX_RECOVERED {
                break;
            }
        }
        Ok(())
    }

    /// First cluster at or after `from` whose FAT entry is free, or None
    /// when the scan passes the end of the FAT.
    fn scan_free(&mut self, from: u32, end_of_fat: u32) -> Result<Option<u32>> {
        let mut cluster = from;
        loop {
            if cluster > end_of_fat {
                return Ok(None);
            }
            if self.volume.next_cluster(cluster)? == FAT_FREE {
                return Ok(Some(cluster));
            }
            cluster += 1;
        }
    }

    fn cmd_help(&mut self, _args: &[String], out: &mut dyn Write) -> Result<()> {
        writeln!(out, " Enter any of the following commands:")?;
        for name in COMMANDS {
            writeln!(out, "   {}", name)?;
        }
        Ok(())
    }
}
