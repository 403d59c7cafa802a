// The FAT engine: entry reads and mirrored writes, FSInfo bookkeeping,
// cluster allocation and chain maintenance.
//
// Every write goes to all FAT copies so the mirrors never disagree, and
// only the low 28 bits of an entry are replaced; the reserved upper nibble
// is carried over from the current value.

use crate::constants::*;
use crate::volume::Volume;
use fatshell_core::{FatshellError, Result};
use log::debug;

impl Volume {
    /// Read the next-cluster pointer for `cluster` from the first FAT copy.
    pub fn next_cluster(&mut self, cluster: u32) -> Result<u32> {
        let offset = self.geometry.fat_entry_byte(cluster, 0);
        Ok(self.image.read_le(offset, 4)? & FAT_MASK)
    }

    /// Set the next-cluster pointer for `cluster` in every FAT copy,
    /// preserving the reserved upper four bits of each 32-bit slot.
    pub fn set_next_cluster(&mut self, cluster: u32, value: u32) -> Result<()> {
        for copy in 0..self.geometry.num_fats {
            let offset = self.geometry.fat_entry_byte(cluster, copy);
            let current = self.image.read_le(offset, 4)?;
            let merged = (current & !FAT_MASK) | (value & FAT_MASK);
            self.image.write_le(offset, 4, merged)?;
        }
        Ok(())
    }

    pub fn free_count(&mut self) -> Result<u32> {
        self.image
            .read_le(self.geometry.fs_info_byte() + FSINFO_FREE_COUNT, 4)
    }

    pub fn set_free_count(&mut self, value: u32) -> Result<()> {
        self.image
            .write_le(self.geometry.fs_info_byte() + FSINFO_FREE_COUNT, 4, value)
    }

    pub fn next_free_hint(&mut self) -> Result<u32> {
        self.image
            .read_le(self.geometry.fs_info_byte() + FSINFO_NEXT_FREE, 4)
    }

    pub fn set_next_free_hint(&mut self, cluster: u32) -> Result<()> {
        self.image
            .write_le(self.geometry.fs_info_byte() + FSINFO_NEXT_FREE, 4, cluster)
    }

    /// Allocate a free cluster and mark it end-of-chain. The search starts
    /// at the FSInfo hint (cluster 2 when the hint is unknown) and restarts
    /// once from cluster 2 before giving up. The cluster's data region is
    /// zeroed before it is linked anywhere, and the FSInfo metadata is
    /// updated before the cluster becomes reachable through `append_to`.
    ///
    /// When `append_to` is nonzero the new cluster is linked after the
    /// terminal cluster of that chain. Returns the new cluster number.
    pub fn allocate(&mut self, append_to: u32) -> Result<u32> {
        let end_of_fat = self.geometry.end_of_fat;
        let mut position = self.next_free_hint()?;
        let mut passes = 0u32;
        if position == FSINFO_HINT_UNKNOWN {
            position = 2;
            passes = 1;
        }

        let mut found = false;
        loop {
            while position < end_of_fat {
                if self.next_cluster(position)? == FAT_FREE {
                    found = true;
                    break;
                }
                position += 1;
            }
            passes += 1;
            if found || passes >= 2 {
                break;
            }
            position = 2;
        }
        if !found {
            return Err(FatshellError::OutOfSpace);
        }

        self.zero_cluster(position)?;
        self.set_next_cluster(position, FAT_MASK)?;
        self.set_next_free_hint(position)?;
        let free = self.free_count()?;
        self.set_free_count(free.saturating_sub(1))?;

        if append_to != 0 {
            let (_, tail) = self.chain_info(append_to)?;
            self.set_next_cluster(tail, position)?;
        }

        debug!("allocated cluster {}", position);
        Ok(position)
    }

    /// Free every cluster of the chain starting at `head`, bumping the
    /// FSInfo free count once per cluster. Returns the number freed.
    pub fn free_chain(&mut self, head: u32) -> Result<u32> {
        let mut current = head;
        let mut freed = 0u32;
        loop {
            let next = self.next_cluster(current)?;
            self.set_next_cluster(current, FAT_FREE)?;
            let free = self.free_count()?;
            self.set_free_count(free + 1)?;
            freed += 1;
            if next >= FAT_EOC {
                break;
            }
            current = next;
        }
        debug!("freed {} clusters from chain at {}", freed, head);
        Ok(freed)
    }

    /// Walk a chain and return its length and terminal cluster.
    pub fn chain_info(&mut self, head: u32) -> Result<(u32, u32)> {
        let mut current = head;
        let mut count = 1u32;
        loop {
            let next = self.next_cluster(current)?;
            if next >= FAT_EOC {
                return Ok((count, current));
            }
            current = next;
            count += 1;
        }
    }

    /// Zero the data region of a cluster.
    pub fn zero_cluster(&mut self, cluster: u32) -> Result<()> {
        let start = self.geometry.cluster_byte(cluster);
        let len = self.geometry.bytes_per_cluster() as u64;
        self.image.fill(start, len, 0)
    }
}
