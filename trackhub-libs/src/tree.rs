//! Arena-backed hub tree.
//!
//! All nodes live in one `Vec` and link to each other by [`NodeId`]. The
//! parent link is a plain back-reference; every edit that touches links
//! restores the rule "if a node has a parent, the parent lists it among its
//! children" before it returns, and fails without touching the tree when the
//! edit is illegal.
//!
//! Nodes are never removed from the arena. Detaching a subtree leaves it
//! intact and usable on its own.

use crate::error::HubError;
use crate::groups::{GroupCollection, SubGroupDefinition};
use crate::node::{AggregateMode, Node, NodeId, NodeKind, check_name};
use crate::params::check_value;
use std::collections::HashMap;
use std::ops::Index;
use std::path::{Component, PathBuf};
use tracing::debug;

/// Upper bound on parent-link hops when looking for a root.
pub const MAX_DEPTH: usize = 64;

/// Owner of every node in a hub.
#[derive(Debug, Clone, Default)]
pub struct HubTree {
    nodes: Vec<Node>,
    groups: HashMap<NodeId, GroupCollection>,
}

/// Ids of the nodes created by [`HubTree::default_hub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultHub {
    pub hub: NodeId,
    pub genomes: NodeId,
    pub genome: NodeId,
    pub trackdb: NodeId,
}

impl Index<NodeId> for HubTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl HubTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever created in this tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, HubError> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| HubError::Structure(format!("{} does not belong to this tree", id)))
    }

    fn check_id(&self, id: NodeId) -> Result<&Node, HubError> {
        self.get(id)
            .ok_or_else(|| HubError::Structure(format!("{} does not belong to this tree", id)))
    }

    /// Create a detached node.
    ///
    /// Hub and track-family nodes get `shortLabel` and `longLabel` set to
    /// their name; callers overwrite them as needed.
    ///
    /// # Arguments
    ///
    /// * `kind` - Kind of the new node
    /// * `name` - Identifier, restricted to `[A-Za-z0-9_]`
    ///
    /// # Returns
    ///
    /// * `Ok(NodeId)` - Id of the new node
    /// * `Err(HubError::Parameter)` - The name uses disallowed characters
    pub fn create(&mut self, kind: NodeKind, name: impl Into<String>) -> Result<NodeId, HubError> {
        let name = name.into();
        check_name(&name)?;

        let mut node = Node::new(kind, name);
        if kind == NodeKind::Hub || kind.is_track() {
            node.params.set("shortLabel", &node.name)?;
            node.params.set("longLabel", &node.name)?;
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        Ok(id)
    }

    /// Create a hub node with its metadata.
    pub fn hub(
        &mut self,
        name: &str,
        short_label: &str,
        long_label: &str,
        email: &str,
    ) -> Result<NodeId, HubError> {
        let id = self.create(NodeKind::Hub, name)?;
        self.add_params(
            id,
            [
                ("shortLabel", short_label),
                ("longLabel", long_label),
                ("email", email),
            ],
        )?;
        Ok(id)
    }

    pub fn genome_collection(&mut self) -> Result<NodeId, HubError> {
        self.create(NodeKind::GenomeCollection, "genomes")
    }

    /// Genome referencing a browser-native assembly
    pub fn genome(&mut self, id: &str) -> Result<NodeId, HubError> {
        self.create(NodeKind::Genome, id)
    }

    /// Genome backed by a local two-bit sequence file
    pub fn assembly(
        &mut self,
        id: &str,
        two_bit: impl Into<PathBuf>,
        organism: &str,
        default_pos: &str,
    ) -> Result<NodeId, HubError> {
        let genome = self.create(NodeKind::Genome, id)?;
        self.add_params(genome, [("organism", organism), ("defaultPos", default_pos)])?;
        self.node_mut(genome)?.two_bit = Some(two_bit.into());
        Ok(genome)
    }

    pub fn trackdb(&mut self) -> Result<NodeId, HubError> {
        self.create(NodeKind::TrackDb, "trackDb")
    }

    /// Leaf track of the given type
    pub fn track(&mut self, name: &str, track_type: &str) -> Result<NodeId, HubError> {
        self.typed(NodeKind::Track, name, track_type)
    }

    pub fn composite(&mut self, name: &str, track_type: &str) -> Result<NodeId, HubError> {
        self.typed(NodeKind::CompositeTrack, name, track_type)
    }

    pub fn super_track(&mut self, name: &str) -> Result<NodeId, HubError> {
        self.create(NodeKind::SuperTrack, name)
    }

    pub fn aggregate(
        &mut self,
        name: &str,
        track_type: &str,
        mode: AggregateMode,
    ) -> Result<NodeId, HubError> {
        let id = self.typed(NodeKind::AggregateTrack, name, track_type)?;
        self.set_aggregate(id, mode)?;
        Ok(id)
    }

    /// View track; `view` is the tag its subtracks are grouped under
    pub fn view(&mut self, name: &str, view: &str, track_type: &str) -> Result<NodeId, HubError> {
        check_name(view)?;
        let id = self.typed(NodeKind::ViewTrack, name, track_type)?;
        self.set_view(id, view)?;
        Ok(id)
    }

    fn typed(&mut self, kind: NodeKind, name: &str, track_type: &str) -> Result<NodeId, HubError> {
        check_value("type", track_type)?;
        let id = self.create(kind, name)?;
        self.node_mut(id)?.params.set("type", track_type)?;
        Ok(id)
    }

    /// Build the connected hub, genome collection, genome and trackDb.
    ///
    /// # Example
    /// ```
    /// use trackhub_libs::HubTree;
    /// let (tree, ids) = HubTree::default_hub("myHub", "hg38", "me@example.com").unwrap();
    /// assert_eq!(tree.root(ids.trackdb).unwrap(), ids.hub);
    /// ```
    pub fn default_hub(
        hub_name: &str,
        genome: &str,
        email: &str,
    ) -> Result<(HubTree, DefaultHub), HubError> {
        let mut tree = HubTree::new();
        let hub = tree.hub(hub_name, hub_name, hub_name, email)?;
        let genomes = tree.genome_collection()?;
        let genome = tree.genome(genome)?;
        let trackdb = tree.trackdb()?;

        tree.add_child(hub, genomes)?;
        tree.add_child(genomes, genome)?;
        tree.add_child(genome, trackdb)?;

        Ok((
            tree,
            DefaultHub {
                hub,
                genomes,
                genome,
                trackdb,
            },
        ))
    }

    /// Attach `child` as the last child of `parent`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Both sides of the link are set
    /// * `Err(HubError::Structure)` - The edit would create a cycle, the parent
    ///   kind does not accept the child kind, the child already has a parent,
    ///   a single-child slot is taken, or a genome id is repeated. The tree is
    ///   left unchanged.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HubError> {
        let parent_node = self.check_id(parent)?;
        let child_node = self.check_id(child)?;

        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(HubError::Structure(format!(
                "attaching {} '{}' under {} '{}' would create a cycle",
                child_node.kind, child_node.name, parent_node.kind, parent_node.name
            )));
        }

        if !parent_node.kind.accepts(child_node.kind) {
            return Err(HubError::Structure(format!(
                "{} '{}' does not accept a {} child",
                parent_node.kind, parent_node.name, child_node.kind
            )));
        }

        if let Some(current) = child_node.parent {
            return Err(HubError::Structure(format!(
                "{} '{}' is already attached to '{}'; detach it first",
                child_node.kind, child_node.name, self[current].name
            )));
        }

        if parent_node.kind.single_child() == Some(child_node.kind)
            && parent_node
                .children
                .iter()
                .any(|c| self[*c].kind == child_node.kind)
        {
            return Err(HubError::Structure(format!(
                "{} '{}' already has a {} child",
                parent_node.kind, parent_node.name, child_node.kind
            )));
        }

        if child_node.kind == NodeKind::Genome
            && parent_node
                .children
                .iter()
                .any(|c| self[*c].name == child_node.name)
        {
            return Err(HubError::Structure(format!(
                "genome '{}' is already in the collection",
                child_node.name
            )));
        }

        debug!(
            "Attaching {} '{}' under {} '{}'",
            child_node.kind, child_node.name, parent_node.kind, parent_node.name
        );
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Same as `add_child(parent, child)`.
    pub fn add_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), HubError> {
        self.add_child(parent, child)
    }

    /// Clear the link between `child` and its parent. No-op for roots.
    pub fn detach(&mut self, child: NodeId) -> Result<(), HubError> {
        let Some(parent) = self.check_id(child)?.parent else {
            return Ok(());
        };
        self.nodes[parent.index()].children.retain(|c| *c != child);
        self.nodes[child.index()].parent = None;
        Ok(())
    }

    /// Follow parent links to the top.
    ///
    /// # Returns
    ///
    /// * `Err(HubError::Structure)` after more than [`MAX_DEPTH`] hops
    pub fn root(&self, id: NodeId) -> Result<NodeId, HubError> {
        self.check_id(id)?;
        let mut current = id;
        for _ in 0..=MAX_DEPTH {
            match self[current].parent {
                Some(parent) => current = parent,
                None => return Ok(current),
            }
        }
        Err(HubError::Structure(format!(
            "no root found within {} steps from {}",
            MAX_DEPTH, id
        )))
    }

    /// Parents of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).and_then(|n| n.parent),
            steps: 0,
        }
    }

    /// Nearest ancestor of the given kind
    pub fn ancestor_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id).find(|a| self[*a].kind == kind)
    }

    /// Childless nodes below (or equal to) `id`, depth-first, left to right.
    ///
    /// Every call starts a fresh traversal.
    pub fn leaves(&self, id: NodeId) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: self.get(id).map(|_| vec![id]).unwrap_or_default(),
        }
    }

    /// Pre-order walk yielding each node with its depth below `id`
    pub fn walk(&self, id: NodeId) -> Walk<'_> {
        Walk {
            tree: self,
            stack: self.get(id).map(|_| vec![(id, 0)]).unwrap_or_default(),
        }
    }

    /// First node named `name` in a pre-order walk from `root`
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.walk(root)
            .map(|(id, _)| id)
            .find(|id| self[*id].name == name)
    }

    /// Change a node's name.
    pub fn rename(&mut self, id: NodeId, name: &str) -> Result<(), HubError> {
        check_name(name)?;
        self.node_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Set parameters on a node.
    ///
    /// Keys the tree derives from structure are rejected, and values of
    /// recognized keys are checked. Nothing is written unless every pair is
    /// accepted.
    pub fn add_params<I, K, V>(&mut self, id: NodeId, params: I) -> Result<(), HubError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let kind = self.check_id(id)?.kind;
        let mut staged = self.nodes[id.index()].params.clone();

        for (key, value) in params {
            let key = key.into();
            if kind.is_managed_key(&key) {
                return Err(HubError::Parameter(format!(
                    "'{}' is managed by the tree and cannot be set on a {}",
                    key, kind
                )));
            }
            let value = value.as_ref();
            check_value(&key, &crate::params::sanitize_value(value))?;
            staged.set(key, value)?;
        }

        self.nodes[id.index()].params = staged;
        Ok(())
    }

    /// Remove parameters; absent keys are ignored.
    pub fn remove_params<'k, I>(&mut self, id: NodeId, keys: I) -> Result<(), HubError>
    where
        I: IntoIterator<Item = &'k str>,
    {
        let node = self.node_mut(id)?;
        for key in keys {
            node.params.remove(key);
        }
        Ok(())
    }

    fn expect_kind(&mut self, id: NodeId, kinds: &[NodeKind], what: &str) -> Result<&mut Node, HubError> {
        let node = self.node_mut(id)?;
        if !kinds.contains(&node.kind) {
            return Err(HubError::Structure(format!(
                "{} does not apply to {} '{}'",
                what, node.kind, node.name
            )));
        }
        Ok(node)
    }

    /// Local data file of a leaf track
    pub fn set_source(&mut self, id: NodeId, source: impl Into<PathBuf>) -> Result<(), HubError> {
        self.expect_kind(id, &[NodeKind::Track], "a data source")?.data.source = Some(source.into());
        Ok(())
    }

    /// Remote url of a leaf track, used verbatim as `bigDataUrl`
    pub fn set_url(&mut self, id: NodeId, url: &str) -> Result<(), HubError> {
        let url = crate::params::sanitize_value(url);
        if url.is_empty() {
            return Err(HubError::Parameter("url cannot be empty".to_string()));
        }
        self.expect_kind(id, &[NodeKind::Track], "a data url")?.data.url = Some(url);
        Ok(())
    }

    /// Remote file name of a leaf track, replacing `<name>.<type>`
    pub fn set_filename(&mut self, id: NodeId, filename: &str) -> Result<(), HubError> {
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\'])
            || filename.contains(char::is_whitespace)
        {
            return Err(HubError::Parameter(format!(
                "'{}' is not a plain file name",
                filename
            )));
        }
        self.expect_kind(id, &[NodeKind::Track], "a data file name")?.data.filename =
            Some(filename.to_string());
        Ok(())
    }

    /// Replace the subgroup tags of a leaf track.
    pub fn set_subgroups<I, D, T>(&mut self, id: NodeId, tags: I) -> Result<(), HubError>
    where
        I: IntoIterator<Item = (D, T)>,
        D: Into<String>,
        T: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (dimension, tag) in tags {
            let (dimension, tag) = (dimension.into(), tag.into());
            check_name(&dimension)?;
            check_name(&tag)?;
            if dimension == "view" {
                return Err(HubError::Parameter(
                    "the 'view' dimension comes from the enclosing view track".to_string(),
                ));
            }
            match pairs.iter_mut().find(|(d, _)| *d == dimension) {
                Some(pair) => pair.1 = tag,
                None => pairs.push((dimension, tag)),
            }
        }
        self.expect_kind(id, &[NodeKind::Track], "subgroup tags")?.subgroups = pairs;
        Ok(())
    }

    /// Append one dimension to a composite's subgroup schema
    pub fn add_subgroup_definition(
        &mut self,
        id: NodeId,
        definition: SubGroupDefinition,
    ) -> Result<(), HubError> {
        self.expect_kind(id, &[NodeKind::CompositeTrack], "a subgroup definition")?
            .schema
            .push(definition);
        Ok(())
    }

    /// Tag grouping the subtracks of a view track
    pub fn set_view(&mut self, id: NodeId, view: &str) -> Result<(), HubError> {
        check_name(view)?;
        self.expect_kind(id, &[NodeKind::ViewTrack], "a view tag")?.view = Some(view.to_string());
        Ok(())
    }

    pub fn set_aggregate(&mut self, id: NodeId, mode: AggregateMode) -> Result<(), HubError> {
        self.expect_kind(id, &[NodeKind::AggregateTrack], "an aggregate mode")?.aggregate = Some(mode);
        Ok(())
    }

    /// Render `parent <name> on|off` for this track
    pub fn set_parent_on(&mut self, id: NodeId, on: bool) -> Result<(), HubError> {
        let node = self.node_mut(id)?;
        if !node.kind.is_track() {
            return Err(HubError::Structure(format!(
                "parent on/off does not apply to {} '{}'",
                node.kind, node.name
            )));
        }
        node.parent_on = Some(on);
        Ok(())
    }

    /// HTML documentation for a track or an assembly genome
    pub fn set_html(&mut self, id: NodeId, html: impl Into<String>) -> Result<(), HubError> {
        let node = self.node_mut(id)?;
        if !(node.kind.is_track() || node.kind == NodeKind::Genome) {
            return Err(HubError::Structure(format!(
                "html documentation does not apply to {} '{}'",
                node.kind, node.name
            )));
        }
        node.html = Some(html.into());
        Ok(())
    }

    /// Override the file name of a hub, genomes or trackDb file.
    ///
    /// Hub and genome-collection paths are relative to the staging root; a
    /// trackDb path is relative to its genome directory. The path may only
    /// descend, so `..` components are rejected.
    pub fn set_filename_override(
        &mut self,
        id: NodeId,
        path: impl Into<PathBuf>,
    ) -> Result<(), HubError> {
        let path = path.into();
        let descends = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        let names_file = path.components().any(|c| matches!(c, Component::Normal(_)));
        if !descends || !names_file {
            return Err(HubError::Parameter(format!(
                "{:?} must be a relative path below its directory",
                path
            )));
        }
        self.expect_kind(
            id,
            &[NodeKind::Hub, NodeKind::GenomeCollection, NodeKind::TrackDb],
            "a file name override",
        )?
        .filename = Some(path);
        Ok(())
    }

    /// Make a genome an assembly backed by a local two-bit file
    pub fn set_two_bit(&mut self, genome: NodeId, two_bit: impl Into<PathBuf>) -> Result<(), HubError> {
        self.expect_kind(genome, &[NodeKind::Genome], "a two-bit file")?.two_bit = Some(two_bit.into());
        Ok(())
    }

    /// Attach a group collection to a genome, replacing any earlier one.
    pub fn attach_groups(&mut self, genome: NodeId, groups: GroupCollection) -> Result<(), HubError> {
        self.expect_kind(genome, &[NodeKind::Genome], "a group collection")?;
        self.groups.insert(genome, groups);
        Ok(())
    }

    /// Groups attached to a genome
    pub fn groups(&self, genome: NodeId) -> Option<&GroupCollection> {
        self.groups.get(&genome)
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    tree: &'a HubTree,
    next: Option<NodeId>,
    steps: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        if self.steps > MAX_DEPTH {
            return None;
        }
        self.steps += 1;
        self.next = self.tree[current].parent;
        Some(current)
    }
}

/// Lazy depth-first iterator over childless nodes.
pub struct Leaves<'a> {
    tree: &'a HubTree,
    stack: Vec<NodeId>,
}

impl Iterator for Leaves<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            let children = &self.tree[id].children;
            if children.is_empty() {
                return Some(id);
            }
            self.stack.extend(children.iter().rev());
        }
        None
    }
}

/// Pre-order iterator yielding `(node, depth)`.
pub struct Walk<'a> {
    tree: &'a HubTree,
    stack: Vec<(NodeId, usize)>,
}

impl Iterator for Walk<'_> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<(NodeId, usize)> {
        let (id, depth) = self.stack.pop()?;
        self.stack
            .extend(self.tree[id].children.iter().rev().map(|c| (*c, depth + 1)));
        Some((id, depth))
    }
}
