// Textual path handling: splitting user input into segments, resolving
// segments against the on-disk directory tree, and rebuilding the display
// path of a directory cluster.

use crate::volume::Volume;
use fatshell_core::{FatshellError, Result};
use log::trace;

/// Split a path into lowercased segments. A leading '/' becomes a first
/// segment of its own; empty segments are dropped.
/// "/exdir/test/file" -> ["/", "exdir", "test", "file"].
pub fn parse(input: &str) -> Vec<String> {
    let input = input.to_ascii_lowercase();
    let mut segments = Vec::new();
    if input.is_empty() {
        return segments;
    }
    if input.starts_with('/') {
        segments.push("/".to_string());
    }
    segments.extend(
        input
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );
    segments
}

impl Volume {
    /// Resolve `segments` starting from the directory cluster `from` and
    /// return the final directory cluster. An empty slice resolves to
    /// `from`. A "/" first segment restarts at the root; "." in the root
    /// is a no-op (the root has no dot entries), and a ".." entry storing
    /// cluster 0 means the root.
    pub fn navigate(&mut self, segments: &[String], from: u32) -> Result<u32> {
        let root = self.geometry.root_cluster;
        let mut current = from;

        for (i, segment) in segments.iter().enumerate() {
            if i == 0 && segment == "/" {
                current = root;
                continue;
            }
            if segment == "." && current == root {
                continue;
            }
            trace!("resolving '{}' in cluster {}", segment, current);
            let entries = self.list_dir(current, false)?;
            let hit = entries
                .iter()
                .find(|e| e.is_directory() && e.display_name() == *segment)
                .ok_or_else(|| FatshellError::NotFound(segment.clone()))?;
            current = if hit.cluster == 0 && segment == ".." {
                root
            } else {
                hit.cluster
            };
        }
        Ok(current)
    }

    /// Rebuild the absolute display path of a directory cluster by walking
    /// its ".." links upward and matching the child cluster in each parent.
    pub fn path_name(&mut self, cluster: u32) -> Result<String> {
        let root = self.geometry.root_cluster;
        let mut names = Vec::new();
        let mut current = cluster;

        while current != root {
            let entries = self.list_dir(current, false)?;
            let parent = entries
                .iter()
                .find(|e| e.display_name() == "..")
                .map(|e| if e.cluster == 0 { root } else { e.cluster })
                .ok_or_else(|| FatshellError::NotFound("..".into()))?;

            let siblings = self.list_dir(parent, false)?;
            let name = siblings
                .iter()
                .find(|e| e.cluster == current && e.display_name() != "." && e.display_name() != "..")
                .map(|e| e.display_name())
                .ok_or_else(|| FatshellError::NotFound("..".into()))?;

            names.push(name);
            current = parent;
        }

        names.reverse();
        Ok(format!("/{}", names.join("/")))
    }
}
