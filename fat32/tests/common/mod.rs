// Shared test fixture: formats a fresh FAT32 image in a temp file.
// 10 MiB, 512 bytes/sector, 1 sector/cluster, 2 FATs, root at cluster 2.
#![allow(dead_code)]

use std::io::{Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

pub const BYTES_PER_SECTOR: u32 = 512;
pub const SECTORS_PER_CLUSTER: u32 = 1;
pub const RESERVED_SECTORS: u32 = 32;
pub const NUM_FATS: u32 = 2;
pub const TOTAL_SECTORS: u32 = 20480; // 10 MiB
pub const ROOT_CLUSTER: u32 = 2;
pub const FS_INFO_SECTOR: u32 = 1;

/// FAT size in sectors, iterated until self-consistent: the FAT must hold
/// one 32-bit entry per data cluster plus the two reserved entries.
pub fn fat_size_sectors() -> u32 {
    let mut fat_size = 1u32;
    loop {
        let data_sectors = TOTAL_SECTORS - RESERVED_SECTORS - NUM_FATS * fat_size;
        let clusters = data_sectors / SECTORS_PER_CLUSTER;
        let needed = ((clusters + 2) * 4 + BYTES_PER_SECTOR - 1) / BYTES_PER_SECTOR;
        if needed == fat_size {
            return fat_size;
        }
        fat_size = needed;
    }
}

pub fn first_data_sector() -> u32 {
    RESERVED_SECTORS + NUM_FATS * fat_size_sectors()
}

pub fn end_of_fat() -> u32 {
    (TOTAL_SECTORS - first_data_sector()) / SECTORS_PER_CLUSTER + 1
}

/// Free clusters on a fresh image: everything in the allocator's scan
/// window except the root directory cluster.
pub fn initial_free_count() -> u32 {
    end_of_fat() - 3
}

/// Build the image and return the tempfile keeping it alive.
pub fn build_image() -> NamedTempFile {
    let file = NamedTempFile::new().expect("create temp image");
    file.as_file()
        .set_len(TOTAL_SECTORS as u64 * BYTES_PER_SECTOR as u64)
        .expect("size image");
    let mut f = file.reopen().expect("reopen image");
    let fat_size = fat_size_sectors();

    // Boot sector
    let mut boot = [0u8; 512];
    boot[11..13].copy_from_slice(&(BYTES_PER_SECTOR as u16).to_le_bytes());
    boot[13] = SECTORS_PER_CLUSTER as u8;
    boot[14..16].copy_from_slice(&(RESERVED_SECTORS as u16).to_le_bytes());
    boot[16] = NUM_FATS as u8;
    // root_entries and fat_size_16 stay zero: that is what makes it FAT32.
    boot[32..36].copy_from_slice(&TOTAL_SECTORS.to_le_bytes());
    boot[36..40].copy_from_slice(&fat_size.to_le_bytes());
    boot[44..48].copy_from_slice(&ROOT_CLUSTER.to_le_bytes());
    boot[48..50].copy_from_slice(&(FS_INFO_SECTOR as u16).to_le_bytes());
    boot[510] = 0x55;
    boot[511] = 0xAA;
    f.seek(SeekFrom::Start(0)).unwrap();
    f.write_all(&boot).unwrap();

    // FS Information Sector
    let mut fsinfo = [0u8; 512];
    fsinfo[0..4].copy_from_slice(&0x41615252u32.to_le_bytes()); // "RRaA"
    fsinfo[484..488].copy_from_slice(&0x61417272u32.to_le_bytes()); // "rrAa"
    fsinfo[488..492].copy_from_slice(&initial_free_count().to_le_bytes());
    fsinfo[492..496].copy_from_slice(&3u32.to_le_bytes());
    fsinfo[508..512].copy_from_slice(&[0x00, 0x00, 0x55, 0xAA]);
    f.seek(SeekFrom::Start(FS_INFO_SECTOR as u64 * BYTES_PER_SECTOR as u64))
        .unwrap();
    f.write_all(&fsinfo).unwrap();

    // Reserved FAT entries and the root directory's end-of-chain, mirrored.
    let mut head = [0u8; 12];
    head[0..4].copy_from_slice(&0x0FFFFFF8u32.to_le_bytes());
    head[4..8].copy_from_slice(&0x0FFFFFFFu32.to_le_bytes());
    head[8..12].copy_from_slice(&0x0FFFFFFFu32.to_le_bytes());
    for copy in 0..NUM_FATS {
        let offset = (RESERVED_SECTORS + copy * fat_size) as u64 * BYTES_PER_SECTOR as u64;
        f.seek(SeekFrom::Start(offset)).unwrap();
        f.write_all(&head).unwrap();
    }

    // Data region, including the root directory cluster, is already zero.
    f.flush().unwrap();
    file
}
