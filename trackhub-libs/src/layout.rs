//! Where every rendered file and referenced data file lives.
//!
//! All paths are relative to the staging root. Paths written into the text
//! files themselves are relative to the file that mentions them and always
//! use `/` separators.

use crate::node::{NodeId, NodeKind};
use crate::params::base_type;
use crate::tree::HubTree;
use std::path::{Component, Path, PathBuf};

pub const HUB_FILE: &str = "hub.txt";
pub const GENOMES_FILE: &str = "genomes.txt";
pub const TRACKDB_FILE: &str = "trackDb.txt";
pub const GROUPS_FILE: &str = "groups.txt";

/// Location of `hub.txt`
pub fn hub_file(tree: &HubTree, hub: NodeId) -> PathBuf {
    tree[hub]
        .filename_override()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(HUB_FILE))
}

/// Location of `genomes.txt`, next to the hub file unless overridden
pub fn genomes_file(tree: &HubTree, collection: NodeId) -> PathBuf {
    if let Some(path) = tree[collection].filename_override() {
        return path.to_path_buf();
    }
    let dir = tree
        .ancestor_of_kind(collection, NodeKind::Hub)
        .map(|hub| parent_dir(&hub_file(tree, hub)))
        .unwrap_or_default();
    dir.join(GENOMES_FILE)
}

/// Directory holding a genome's files
pub fn genome_dir(tree: &HubTree, genome: NodeId) -> PathBuf {
    let base = tree
        .ancestor_of_kind(genome, NodeKind::GenomeCollection)
        .map(|collection| parent_dir(&genomes_file(tree, collection)))
        .unwrap_or_default();
    base.join(tree[genome].name())
}

/// Genome directory of any node below a genome, empty for detached nodes
fn enclosing_genome_dir(tree: &HubTree, id: NodeId) -> PathBuf {
    match tree.ancestor_of_kind(id, NodeKind::Genome) {
        Some(genome) => genome_dir(tree, genome),
        None => PathBuf::new(),
    }
}

/// Location of a `trackDb.txt`
pub fn trackdb_file(tree: &HubTree, trackdb: NodeId) -> PathBuf {
    let name = tree[trackdb]
        .filename_override()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(TRACKDB_FILE));
    enclosing_genome_dir(tree, trackdb).join(name)
}

pub fn groups_file(tree: &HubTree, genome: NodeId) -> PathBuf {
    genome_dir(tree, genome).join(GROUPS_FILE)
}

/// Staged location of an assembly's two-bit file
pub fn two_bit_file(tree: &HubTree, genome: NodeId) -> PathBuf {
    genome_dir(tree, genome).join(format!("{}.2bit", tree[genome].name()))
}

pub fn genome_html_file(tree: &HubTree, genome: NodeId) -> PathBuf {
    genome_dir(tree, genome).join(format!("{}_info.html", tree[genome].name()))
}

pub fn track_html_file(tree: &HubTree, track: NodeId) -> PathBuf {
    enclosing_genome_dir(tree, track).join(format!("{}.html", tree[track].name()))
}

/// Staged location of a leaf track's data file.
///
/// `None` for tracks without a local source; those point at their url.
pub fn data_file(tree: &HubTree, track: NodeId) -> Option<PathBuf> {
    let node = &tree[track];
    node.data().source.as_ref()?;

    let filename = match &node.data().filename {
        Some(filename) => filename.clone(),
        None => format!(
            "{}.{}",
            node.name(),
            node.track_type().map(base_type).unwrap_or("dat")
        ),
    };
    Some(enclosing_genome_dir(tree, track).join(filename))
}

/// Value of a leaf track's `bigDataUrl` line
pub fn big_data_url(tree: &HubTree, track: NodeId) -> Option<String> {
    if let Some(url) = &tree[track].data().url {
        return Some(url.clone());
    }
    let data = data_file(tree, track)?;
    let trackdb_dir = tree
        .ancestor_of_kind(track, NodeKind::TrackDb)
        .map(|trackdb| parent_dir(&trackdb_file(tree, trackdb)))
        .unwrap_or_default();
    Some(relpath(&trackdb_dir, &data))
}

/// Extension of the index file staged next to data of this type
pub fn index_companion(track_type: &str) -> Option<&'static str> {
    match base_type(track_type) {
        "bam" => Some("bai"),
        "vcfTabix" => Some("tbi"),
        _ => None,
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Path from directory `from` to `to`, both relative to the same root.
///
/// # Example
/// ```
/// use std::path::Path;
/// use trackhub_libs::layout::relpath;
/// assert_eq!(relpath(Path::new("hg38"), Path::new("hg38/a.bw")), "a.bw");
/// assert_eq!(relpath(Path::new("hg38"), Path::new("shared/a.bw")), "../shared/a.bw");
/// ```
pub fn relpath(from: &Path, to: &Path) -> String {
    let from: Vec<Component> = from.components().filter(|c| *c != Component::CurDir).collect();
    let to: Vec<Component> = to.components().filter(|c| *c != Component::CurDir).collect();

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let (mut tree, ids) = HubTree::default_hub("h", "hg38", "a@b.c").unwrap();
        let track = tree.track("reads", "bam").unwrap();
        tree.add_child(ids.trackdb, track).unwrap();
        tree.set_source(track, "/data/reads.bam").unwrap();

        assert_eq!(hub_file(&tree, ids.hub), PathBuf::from("hub.txt"));
        assert_eq!(genomes_file(&tree, ids.genomes), PathBuf::from("genomes.txt"));
        assert_eq!(trackdb_file(&tree, ids.trackdb), PathBuf::from("hg38/trackDb.txt"));
        assert_eq!(groups_file(&tree, ids.genome), PathBuf::from("hg38/groups.txt"));
        assert_eq!(two_bit_file(&tree, ids.genome), PathBuf::from("hg38/hg38.2bit"));
        assert_eq!(data_file(&tree, track), Some(PathBuf::from("hg38/reads.bam")));
        assert_eq!(big_data_url(&tree, track), Some("reads.bam".to_string()));
    }

    #[test]
    fn test_overrides() {
        let (mut tree, ids) = HubTree::default_hub("h", "hg38", "a@b.c").unwrap();
        tree.set_filename_override(ids.hub, "hubs/my.hub.txt").unwrap();
        let track = tree.track("peaks", "bigBed 6+4").unwrap();
        tree.add_child(ids.trackdb, track).unwrap();
        tree.set_source(track, "/data/p.bb").unwrap();
        tree.set_filename(track, "peaks_v2.bb").unwrap();

        assert_eq!(genomes_file(&tree, ids.genomes), PathBuf::from("hubs/genomes.txt"));
        assert_eq!(trackdb_file(&tree, ids.trackdb), PathBuf::from("hubs/hg38/trackDb.txt"));
        assert_eq!(big_data_url(&tree, track), Some("peaks_v2.bb".to_string()));

        tree.set_url(track, "https://example.org/p.bb").unwrap();
        assert_eq!(big_data_url(&tree, track), Some("https://example.org/p.bb".to_string()));
    }

    #[test]
    fn test_nested_trackdb_override_keeps_data_urls_resolvable() {
        let (mut tree, ids) = HubTree::default_hub("h", "hg38", "a@b.c").unwrap();
        let track = tree.track("reads", "bigWig").unwrap();
        tree.add_child(ids.trackdb, track).unwrap();
        tree.set_source(track, "/data/reads.bw").unwrap();

        assert!(tree.set_filename_override(ids.trackdb, "../shared/trackDb.txt").is_err());
        assert_eq!(trackdb_file(&tree, ids.trackdb), PathBuf::from("hg38/trackDb.txt"));

        tree.set_filename_override(ids.trackdb, "./db/trackDb.txt").unwrap();
        assert_eq!(trackdb_file(&tree, ids.trackdb), PathBuf::from("hg38/db/trackDb.txt"));
        assert_eq!(data_file(&tree, track), Some(PathBuf::from("hg38/reads.bigWig")));
        assert_eq!(big_data_url(&tree, track), Some("../reads.bigWig".to_string()));
    }

    #[test]
    fn test_url_only_track_has_no_local_file() {
        let mut tree = HubTree::new();
        let track = tree.track("remote", "bigWig").unwrap();
        tree.set_url(track, "https://example.org/r.bw").unwrap();
        assert_eq!(data_file(&tree, track), None);
        assert_eq!(big_data_url(&tree, track), Some("https://example.org/r.bw".to_string()));
    }

    #[test]
    fn test_index_companion() {
        assert_eq!(index_companion("bam"), Some("bai"));
        assert_eq!(index_companion("vcfTabix"), Some("tbi"));
        assert_eq!(index_companion("bigWig"), None);
    }

    #[test]
    fn test_relpath() {
        assert_eq!(relpath(Path::new(""), Path::new("hg38/trackDb.txt")), "hg38/trackDb.txt");
        assert_eq!(relpath(Path::new("a/b"), Path::new("a/c/d.txt")), "../c/d.txt");
    }
}
