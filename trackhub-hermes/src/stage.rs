//! Staging module
//!
//! Materializes a rendered hub in a local directory: the text files are
//! written in place and every local data file is symlinked next to them.

use crate::error::StageError;
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use trackhub_libs::layout;
use trackhub_libs::{HubTree, NodeId, NodeKind, RenderedFile};
use walkdir::WalkDir;

/// Result of staging one hub
#[derive(Debug, Clone, Serialize)]
pub struct StagedHub {
    /// Staging root
    pub root: PathBuf,

    /// Written text files, relative to the root
    pub files: Vec<PathBuf>,

    /// Created symlinks, relative to the root
    pub links: Vec<PathBuf>,
}

/// A symlink to create: staged location and the absolute source it points at
#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    dest: PathBuf,
    source: PathBuf,
}

/// Writes rendered hubs into a staging directory
pub struct Stager {
    staging_dir: PathBuf,
}

impl Stager {
    /// Create a stager rooted at `staging_dir`
    pub fn new<P: AsRef<Path>>(staging_dir: P) -> Self {
        Self {
            staging_dir: staging_dir.as_ref().to_path_buf(),
        }
    }

    /// Stage a rendered hub
    ///
    /// Every link source and destination is checked before anything is
    /// written, so a missing data file, a path leaving the staging root or
    /// two outputs claiming the same path leave the staging directory
    /// untouched. Existing links and files at the same locations are
    /// replaced, which makes re-staging idempotent.
    ///
    /// # Arguments
    ///
    /// * `tree` - Tree the files were rendered from
    /// * `root` - Hub (or trackDb) node that was rendered
    /// * `rendered` - Output of `trackhub_libs::render`
    ///
    /// # Returns
    ///
    /// * `Ok(StagedHub)` - What was written and linked
    /// * `Err(StageError::Staging)` - A referenced local file does not exist,
    ///   or the staged paths escape the root or collide
    pub fn stage(
        &self,
        tree: &HubTree,
        root: NodeId,
        rendered: &[RenderedFile],
    ) -> Result<StagedHub, StageError> {
        let links = plan_links(tree, root)?;
        check_destinations(rendered, &links)?;

        fs::create_dir_all(&self.staging_dir)?;

        let mut files = Vec::with_capacity(rendered.len());
        for file in rendered {
            let dest = self.staging_dir.join(&file.path);
            ensure_parent(&dest)?;
            fs::write(&dest, &file.contents)?;
            debug!("Wrote {:?}", dest);
            files.push(file.path.clone());
        }

        let mut linked = Vec::with_capacity(links.len());
        for link in links {
            let dest = self.staging_dir.join(&link.dest);
            ensure_parent(&dest)?;
            replace_link(&link.source, &dest)?;
            debug!("Linked {:?} -> {:?}", dest, link.source);
            linked.push(link.dest);
        }

        info!(
            "Staged {} files and {} links in {:?}",
            files.len(),
            linked.len(),
            self.staging_dir
        );

        Ok(StagedHub {
            root: self.staging_dir.clone(),
            files,
            links: linked,
        })
    }

    /// Every file and link currently under the staging root, relative and sorted
    pub fn list_staged(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.staging_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&self.staging_dir)
                    .ok()
                    .map(Path::to_path_buf)
            })
            .collect()
    }
}

/// Collect every symlink the hub below `root` needs, checking that sources exist
fn plan_links(tree: &HubTree, root: NodeId) -> Result<Vec<Link>, StageError> {
    let mut links = Vec::new();

    for (id, _) in tree.walk(root) {
        let node = &tree[id];
        match node.kind() {
            NodeKind::Track => {
                let (Some(source), Some(dest)) =
                    (node.data().source.as_ref(), layout::data_file(tree, id))
                else {
                    continue;
                };
                let source = resolve_source(source, node.name())?;

                if let Some(ext) = node.track_type().and_then(layout::index_companion) {
                    let index = resolve_source(&with_suffix(&source, ext), node.name())?;
                    links.push(Link {
                        dest: with_suffix(&dest, ext),
                        source: index,
                    });
                }
                links.push(Link { dest, source });
            }
            NodeKind::Genome => {
                if let Some(two_bit) = node.two_bit() {
                    links.push(Link {
                        dest: layout::two_bit_file(tree, id),
                        source: resolve_source(two_bit, node.name())?,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(links)
}

/// Each staged path must stay below the root and be claimed only once
fn check_destinations(rendered: &[RenderedFile], links: &[Link]) -> Result<(), StageError> {
    let mut claimed = HashSet::new();
    let paths = rendered
        .iter()
        .map(|file| file.path.as_path())
        .chain(links.iter().map(|link| link.dest.as_path()));

    for path in paths {
        if !claimed.insert(below_root(path)?) {
            return Err(StageError::Staging(format!(
                "{:?} is staged twice; rename the track or its data file",
                path
            )));
        }
    }
    Ok(())
}

/// `path` without `.` components, or an error if it is not strictly below the root
fn below_root(path: &Path) -> Result<PathBuf, StageError> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            _ => {
                return Err(StageError::Staging(format!(
                    "{:?} would be staged outside the staging directory",
                    path
                )));
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(StageError::Staging(format!("{:?} names no file", path)));
    }
    Ok(normalized)
}

/// Absolute path of an existing source file
fn resolve_source(source: &Path, owner: &str) -> Result<PathBuf, StageError> {
    fs::canonicalize(source).map_err(|e| {
        StageError::Staging(format!(
            "Data file {:?} of '{}' is not available: {}",
            source, owner, e
        ))
    })
}

/// `a/b.bam` + `bai` -> `a/b.bam.bai`
fn with_suffix(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn ensure_parent(path: &Path) -> Result<(), StageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Point `dest` at `source`, removing whatever was there before
fn replace_link(source: &Path, dest: &Path) -> Result<(), StageError> {
    if let Ok(meta) = fs::symlink_metadata(dest) {
        if meta.is_dir() {
            return Err(StageError::Staging(format!(
                "Cannot link {:?}: a directory is in the way",
                dest
            )));
        }
        fs::remove_file(dest)?;
    }
    symlink(source, dest)?;
    Ok(())
}

#[cfg(unix)]
fn symlink(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(windows)]
fn symlink(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(source, dest)
}
