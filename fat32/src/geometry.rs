// Boot sector parsing and the derived volume layout.
// Validation refuses anything that is not a FAT32 volume: a nonzero 16-bit
// FAT size or root entry count means FAT12/FAT16 and the mount fails.

use crate::constants::*;
use fatshell_core::{FatshellError, Image, Result};
use log::debug;

/// Parsed boot-sector fields plus the derived layout, immutable after mount.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub num_fats: u32,
    /// FAT size in sectors, from the 32-bit field.
    pub fat_size: u32,
    pub root_cluster: u32,
    pub fs_info_sector: u32,
    pub total_sectors: u32,
    pub first_data_sector: u32,
    /// Count-of-clusters upper bound; FAT indices at or past this are
    /// never handed out by the allocator.
    pub end_of_fat: u32,
}

impl Geometry {
    /// Read and validate the boot sector of a mounted image.
    pub fn parse(image: &mut Image) -> Result<Self> {
        let mut signature = [0u8; 2];
        image
            .read_bytes(BOOT_SIGNATURE_OFFSET, &mut signature)
            .map_err(|_| FatshellError::Mount("image smaller than a boot sector".into()))?;
        if signature != BOOT_SIGNATURE {
            return Err(FatshellError::Mount("bad boot sector signature".into()));
        }

        let bytes_per_sector = image.read_le(BPB_BYTES_PER_SEC, 2)?;
        let sectors_per_cluster = image.read_le(BPB_SEC_PER_CLUS, 1)?;
        let reserved_sectors = image.read_le(BPB_RSVD_SEC_CNT, 2)?;
        let num_fats = image.read_le(BPB_NUM_FATS, 1)?;
        let root_entry_count = image.read_le(BPB_ROOT_ENT_CNT, 2)?;
        let fat_size_16 = image.read_le(BPB_FAT_SZ16, 2)?;
        let total_sectors = image.read_le(BPB_TOT_SEC32, 4)?;
        let fat_size = image.read_le(BPB_FAT_SZ32, 4)?;
        let root_cluster = image.read_le(BPB_ROOT_CLUS, 4)?;
        let fs_info_sector = image.read_le(BPB_FS_INFO, 2)?;

        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096) {
            return Err(FatshellError::Mount(format!(
                "bytes per sector out of range: {}",
                bytes_per_sector
            )));
        }
        if !matches!(sectors_per_cluster, 1 | 2 | 4 | 8 | 16 | 32 | 64 | 128) {
            return Err(FatshellError::Mount(format!(
                "sectors per cluster out of range: {}",
                sectors_per_cluster
            )));
        }
        if fat_size_16 != 0 {
            return Err(FatshellError::Mount(
                "16-bit FAT size is set; not a FAT32 volume".into(),
            ));
        }
        if root_entry_count != 0 {
            return Err(FatshellError::Mount(
                "fixed root directory present; not a FAT32 volume".into(),
            ));
        }
        if total_sectors == 0 {
            return Err(FatshellError::Mount("zero total sectors".into()));
        }

        // FAT32 has no fixed root directory area, so the data region starts
        // right after the reserved sectors and the FAT copies.
        let first_data_sector = reserved_sectors + num_fats * fat_size;
        let end_of_fat = (total_sectors - first_data_sector) / sectors_per_cluster + 1;

        debug!(
            "parsed boot sector: {} bytes/sector, {} sectors/cluster, {} FATs of {} sectors, \
             data starts at sector {}",
            bytes_per_sector, sectors_per_cluster, num_fats, fat_size, first_data_sector
        );

        Ok(Geometry {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            fat_size,
            root_cluster,
            fs_info_sector,
            total_sectors,
            first_data_sector,
            end_of_fat,
        })
    }

    pub fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    pub fn first_sector_of_cluster(&self, cluster: u32) -> u32 {
        debug_assert!(cluster >= 2);
        self.first_data_sector + (cluster - 2) * self.sectors_per_cluster
    }

    /// Byte offset of the first data byte of a cluster.
    pub fn cluster_byte(&self, cluster: u32) -> u64 {
        self.first_sector_of_cluster(cluster) as u64 * self.bytes_per_sector as u64
    }

    pub fn fat_sector_of(&self, cluster: u32) -> u32 {
        self.reserved_sectors + (cluster * 4) / self.bytes_per_sector
    }

    pub fn fat_offset_in_sector(&self, cluster: u32) -> u32 {
        (cluster * 4) % self.bytes_per_sector
    }

    /// Byte offset of a cluster's FAT entry in the given FAT copy.
    pub fn fat_entry_byte(&self, cluster: u32, copy: u32) -> u64 {
        debug_assert!(copy < self.num_fats);
        (self.fat_sector_of(cluster) + copy * self.fat_size) as u64 * self.bytes_per_sector as u64
            + self.fat_offset_in_sector(cluster) as u64
    }

    /// Byte offset of the FS Information Sector.
    pub fn fs_info_byte(&self) -> u64 {
        self.fs_info_sector as u64 * self.bytes_per_sector as u64
    }
}
