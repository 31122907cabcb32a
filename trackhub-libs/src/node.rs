//! Node identity, node kinds and the per-kind rule tables.
//!
//! The set of node kinds is closed. Everything the validator and renderer
//! need to know about a kind (which children it accepts, which parameters it
//! requires or forbids, which trailer line closes its stanza) lives in the
//! tables on [`NodeKind`], so both passes are single generic traversals.

use crate::error::HubError;
use crate::groups::SubGroupDefinition;
use crate::params::ParameterStore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

/// Index into `HubTree::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Hub,
    GenomeCollection,
    Genome,
    TrackDb,
    Track,
    CompositeTrack,
    SuperTrack,
    AggregateTrack,
    ViewTrack,
}

/// Keys the tree derives from structure; callers never set them directly.
const MANAGED_TRACK_KEYS: &[&str] = &[
    "track",
    "parent",
    "subGroups",
    "compositeTrack",
    "superTrack",
    "container",
    "view",
    "aggregate",
    "bigDataUrl",
];

impl NodeKind {
    /// Kinds accepted as direct children
    pub fn allowed_children(self) -> &'static [NodeKind] {
        use NodeKind::*;
        match self {
            Hub => &[GenomeCollection],
            GenomeCollection => &[Genome],
            Genome => &[TrackDb],
            TrackDb => &[Track, CompositeTrack, SuperTrack, AggregateTrack],
            SuperTrack => &[Track, CompositeTrack, AggregateTrack],
            CompositeTrack => &[Track, ViewTrack],
            ViewTrack => &[Track],
            AggregateTrack => &[Track],
            Track => &[],
        }
    }

    /// Child kind that must appear exactly once, if any
    pub fn single_child(self) -> Option<NodeKind> {
        match self {
            NodeKind::Hub => Some(NodeKind::GenomeCollection),
            NodeKind::Genome => Some(NodeKind::TrackDb),
            _ => None,
        }
    }

    /// Parameters that must be present before rendering
    pub fn required_params(self) -> &'static [&'static str] {
        use NodeKind::*;
        match self {
            Hub => &["shortLabel", "longLabel", "email"],
            GenomeCollection | Genome | TrackDb => &[],
            SuperTrack => &["shortLabel", "longLabel"],
            Track | CompositeTrack | AggregateTrack | ViewTrack => {
                &["shortLabel", "longLabel", "type"]
            }
        }
    }

    /// Parameters that may never appear in the node's store
    pub fn forbidden_params(self) -> &'static [&'static str] {
        use NodeKind::*;
        match self {
            Hub => &["hub", "genomesFile"],
            GenomeCollection => &[],
            Genome => &["genome", "trackDb", "twoBitPath", "groups", "htmlDocumentation"],
            TrackDb => &[],
            SuperTrack => &["type"],
            Track | CompositeTrack | AggregateTrack | ViewTrack => &[],
        }
    }

    /// Whether `key` is derived from structure and so rejected in the store
    pub fn is_managed_key(self, key: &str) -> bool {
        if self.forbidden_params().contains(&key) {
            return true;
        }
        self.is_track() && (MANAGED_TRACK_KEYS.contains(&key) || is_numbered_subgroup(key))
    }

    /// Line that closes the stanza of this kind
    pub fn trailer(self) -> Option<&'static str> {
        match self {
            NodeKind::CompositeTrack => Some("compositeTrack on"),
            NodeKind::SuperTrack => Some("superTrack on"),
            NodeKind::AggregateTrack => Some("container multiWig"),
            _ => None,
        }
    }

    /// Containers that must hold at least one child
    pub fn must_have_children(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            GenomeCollection | TrackDb | CompositeTrack | SuperTrack | AggregateTrack | ViewTrack
        )
    }

    /// Member of the track family
    pub fn is_track(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            Track | CompositeTrack | SuperTrack | AggregateTrack | ViewTrack
        )
    }

    pub fn accepts(self, child: NodeKind) -> bool {
        self.allowed_children().contains(&child)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Hub => "Hub",
            NodeKind::GenomeCollection => "GenomeCollection",
            NodeKind::Genome => "Genome",
            NodeKind::TrackDb => "TrackDb",
            NodeKind::Track => "Track",
            NodeKind::CompositeTrack => "CompositeTrack",
            NodeKind::SuperTrack => "SuperTrack",
            NodeKind::AggregateTrack => "AggregateTrack",
            NodeKind::ViewTrack => "ViewTrack",
        };
        f.write_str(name)
    }
}

fn is_numbered_subgroup(key: &str) -> bool {
    key.strip_prefix("subGroup")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// How an aggregate track overlays its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateMode {
    TransparentOverlay,
    Stacked,
    SolidOverlay,
    None,
}

impl AggregateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateMode::TransparentOverlay => "transparentOverlay",
            AggregateMode::Stacked => "stacked",
            AggregateMode::SolidOverlay => "solidOverlay",
            AggregateMode::None => "none",
        }
    }
}

impl FromStr for AggregateMode {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transparentOverlay" => Ok(AggregateMode::TransparentOverlay),
            "stacked" => Ok(AggregateMode::Stacked),
            "solidOverlay" => Ok(AggregateMode::SolidOverlay),
            "none" => Ok(AggregateMode::None),
            other => Err(HubError::Parameter(format!(
                "'{}' is not an aggregate mode",
                other
            ))),
        }
    }
}

/// Reference from a leaf track to its data file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFile {
    /// Local file that staging links into place
    pub source: Option<PathBuf>,
    /// Remote location used verbatim as `bigDataUrl`
    pub url: Option<String>,
    /// Remote file name replacing `<name>.<type>`
    pub filename: Option<String>,
}

impl DataFile {
    pub fn is_set(&self) -> bool {
        self.source.is_some() || self.url.is_some()
    }
}

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex"));

/// Reject names outside `[A-Za-z0-9_]`.
///
/// # Returns
///
/// * `Ok(())` if the name is non-empty and uses only the allowed alphabet
/// * `Err(HubError::Parameter)` otherwise
pub fn check_name(name: &str) -> Result<(), HubError> {
    if NAME.is_match(name) {
        Ok(())
    } else {
        Err(HubError::Parameter(format!(
            "name '{}' must be non-empty and use only letters, digits and underscores",
            name
        )))
    }
}

/// One node of the hub tree.
///
/// Nodes are owned by a `HubTree` and refer to each other by [`NodeId`].
/// The fields beyond `params` carry kind-specific data; fields that do not
/// apply to a node's kind stay empty.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) params: ParameterStore,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) data: DataFile,
    pub(crate) subgroups: Vec<(String, String)>,
    pub(crate) schema: Vec<SubGroupDefinition>,
    pub(crate) view: Option<String>,
    pub(crate) aggregate: Option<AggregateMode>,
    pub(crate) parent_on: Option<bool>,
    pub(crate) html: Option<String>,
    pub(crate) filename: Option<PathBuf>,
    pub(crate) two_bit: Option<PathBuf>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, name: String) -> Self {
        Self {
            name,
            kind,
            params: ParameterStore::new(),
            children: Vec::new(),
            parent: None,
            data: DataFile::default(),
            subgroups: Vec::new(),
            schema: Vec::new(),
            view: None,
            aggregate: None,
            parent_on: None,
            html: None,
            filename: None,
            two_bit: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Shorthand for the `type` parameter
    pub fn track_type(&self) -> Option<&str> {
        self.params.get("type")
    }

    pub fn data(&self) -> &DataFile {
        &self.data
    }

    /// Subgroup tags of a leaf track, as `(dimension, tag)` pairs
    pub fn subgroups(&self) -> &[(String, String)] {
        &self.subgroups
    }

    /// Subgroup schema of a composite track
    pub fn schema(&self) -> &[SubGroupDefinition] {
        &self.schema
    }

    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    pub fn aggregate(&self) -> Option<AggregateMode> {
        self.aggregate
    }

    pub fn parent_on(&self) -> Option<bool> {
        self.parent_on
    }

    /// HTML documentation body
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    /// File name override for hub, genomes and trackDb files
    pub fn filename_override(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Local two-bit sequence of an assembly genome
    pub fn two_bit(&self) -> Option<&Path> {
        self.two_bit.as_deref()
    }

    /// Genome backed by a local two-bit file
    pub fn is_assembly(&self) -> bool {
        self.kind == NodeKind::Genome && self.two_bit.is_some()
    }
}
