// A mounted FAT32 volume: the image plus its parsed geometry.

use crate::geometry::Geometry;
use fatshell_core::{Image, Result};
use log::info;
use std::path::Path;

pub struct Volume {
    pub(crate) image: Image,
    pub(crate) geometry: Geometry,
}

impl Volume {
    /// Open an image file and validate it as a FAT32 volume.
    pub fn mount(path: &Path) -> Result<Self> {
        let mut image = Image::open(path)?;
        let geometry = Geometry::parse(&mut image)?;
        info!(
            "mounted {}: {} total sectors, {} bytes/sector, {} sectors/cluster, \
             {} FATs, root cluster {}",
            path.display(),
            geometry.total_sectors,
            geometry.bytes_per_sector,
            geometry.sectors_per_cluster,
            geometry.num_fats,
            geometry.root_cluster
        );
        Ok(Volume { image, geometry })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Raw access to the underlying image.
    pub fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }
}
