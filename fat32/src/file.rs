// File content access across a cluster chain. Reads and writes share the
// same walk: skip whole clusters to reach the start offset, then transfer
// cluster by cluster until the byte count is satisfied or the chain ends.

use crate::constants::FAT_EOC;
use crate::volume::Volume;
use fatshell_core::{FatshellError, Result};

impl Volume {
    /// Advance from `head` to the cluster containing byte offset `start`.
    /// Fails when the chain ends before the offset is reached.
    fn seek_chain(&mut self, head: u32, start: u32) -> Result<(u32, u32)> {
        let cluster_size = self.geometry.bytes_per_cluster();
        let mut current = head;
        for _ in 0..start / cluster_size {
            current = self.next_cluster(current)?;
            if current >= FAT_EOC {
                return Err(FatshellError::StartOutOfBounds);
            }
        }
        Ok((current, start % cluster_size))
    }

    /// Read up to `length` bytes beginning at byte offset `start` of the
    /// chain at `head`. Short reads happen when the chain ends first.
    pub fn read_span(&mut self, head: u32, start: u32, length: u32) -> Result<Vec<u8>> {
        let (mut current, mut offset) = self.seek_chain(head, start)?;
        let cluster_size = self.geometry.bytes_per_cluster();
        let mut data = Vec::with_capacity(length as usize);

        while (data.len() as u32) < length && (2..FAT_EOC).contains(&current) {
            let take = (cluster_size - offset).min(length - data.len() as u32);
            let loc = self.geometry.cluster_byte(current) + offset as u64;
            let mut buf = vec![0u8; take as usize];
            self.image.read_bytes(loc, &mut buf)?;
            data.extend_from_slice(&buf);
            current = self.next_cluster(current)?;
            offset = 0;
        }
        Ok(data)
    }

    /// Write `data` beginning at byte offset `start` of the chain at
    /// `head`. The chain must already be long enough; bytes past its end
    /// are dropped. Returns the number of bytes written.
    pub fn write_span(&mut self, head: u32, start: u32, data: &[u8]) -> Result<u32> {
        let (mut current, mut offset) = self.seek_chain(head, start)?;
        let cluster_size = self.geometry.bytes_per_cluster();
        let mut written = 0u32;

        while (written as usize) < data.len() && (2..FAT_EOC).contains(&current) {
            let take = (cluster_size - offset).min(data.len() as u32 - written);
            let loc = self.geometry.cluster_byte(current) + offset as u64;
            self.image
                .write_bytes(loc, &data[written as usize..(written + take) as usize])?;
            written += take;
            current = self.next_cluster(current)?;
            offset = 0;
        }
        Ok(written)
    }
}
