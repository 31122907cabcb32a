//! # Track Hub Libraries
//!
//! Core library for building genome-browser track hubs. A hub is modelled as
//! a tree of typed nodes (hub, genome collection, genome, trackDb and the
//! track family) stored in an arena, validated as a whole, and rendered into
//! the hub's text files.
//!
//! ## Main Components
//!
//! - `HubTree`: arena of nodes with attach/detach and parameter operations
//! - `ParameterStore` and the recognized-options table in [`params`]
//! - `validate`: whole-tree validation collecting every violation
//! - `render`: serialization into `hub.txt`, `genomes.txt`, `trackDb.txt`,
//!   `groups.txt` and documentation files
//! - `HubError`: standardized error handling
//! - Hub definition files (`hub.yaml`) that build a tree

pub mod config;
pub mod error;
pub mod groups;
pub mod helpers;
pub mod layout;
pub mod node;
pub mod params;
pub mod render;
pub mod tree;
pub mod validate;

// Re-export main types for convenience
pub use config::{
    load_hub_config, GenomeConfig, HubConfig, HubSection, SubGroupConfig, TrackConfig, TrackKind,
};
pub use error::{HubError, Rule, ValidationError, Violation};
pub use groups::{GroupCollection, GroupDefinition, SubGroupDefinition};
pub use node::{AggregateMode, DataFile, Node, NodeId, NodeKind};
pub use params::ParameterStore;
pub use render::{render, render_with, RenderOptions, RenderedFile};
pub use tree::{DefaultHub, HubTree, MAX_DEPTH};
pub use validate::{validate, validate_with, ValidateOptions};

/// Result type alias using HubError
pub type Result<T> = std::result::Result<T, HubError>;
