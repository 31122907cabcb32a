//! Hub definition files.
//!
//! A hub definition (`hub.yaml`) describes a whole hub: its metadata, its
//! genomes and their nested tracks. [`load_hub_config`] reads and checks a
//! definition, and [`HubConfig::build`] turns it into a [`HubTree`].

use crate::error::HubError;
use crate::groups::{GroupCollection, GroupDefinition, SubGroupDefinition};
use crate::helpers;
use crate::node::{AggregateMode, NodeId, NodeKind};
use crate::tree::HubTree;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Root of a hub definition file.
///
/// # Example YAML
///
/// ```yaml
/// hub:
///   name: "myHub"
///   short_label: "My hub"
///   long_label: "Signal and peaks for my lab"
///   email: "me@example.com"
/// genomes:
///   - name: "hg38"
///     tracks:
///       - name: "signal"
///         kind: "composite"
///         type: "bigWig"
///         subgroup_definitions:
///           - name: "cell"
///             label: "Cell line"
///             mapping:
///               k562: "K562"
///               hela: "HeLa"
///         tracks:
///           - name: "k562_signal"
///             type: "bigWig"
///             source: "data/k562.bw"
///             subgroups:
///               cell: "k562"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub hub: HubSection,

    #[serde(default)]
    pub genomes: Vec<GenomeConfig>,

    /// Directory relative sources resolve against; set by the loader
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Hub-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSection {
    pub name: String,

    /// Defaults to the hub name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_label: Option<String>,

    /// Defaults to the short label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_label: Option<String>,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_url: Option<String>,

    /// Hub file path override, relative to the staging root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<PathBuf>,
}

/// One genome and its tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConfig {
    /// Assembly identifier, e.g. `hg38`
    pub name: String,

    /// Local two-bit file; makes this an assembly genome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two_bit: Option<PathBuf>,

    /// Extra genome parameters (`organism`, `defaultPos`, `description`, ...)
    #[serde(default)]
    pub params: Mapping,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(default)]
    pub groups: Vec<GroupDefinition>,

    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

/// Kind of a configured track.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    #[default]
    Track,
    Composite,
    Super,
    Aggregate,
    View,
}

impl From<TrackKind> for NodeKind {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Track => NodeKind::Track,
            TrackKind::Composite => NodeKind::CompositeTrack,
            TrackKind::Super => NodeKind::SuperTrack,
            TrackKind::Aggregate => NodeKind::AggregateTrack,
            TrackKind::View => NodeKind::ViewTrack,
        }
    }
}

/// A track and, for containers, its nested tracks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackConfig {
    pub name: String,

    #[serde(default)]
    pub kind: TrackKind,

    /// Track type, e.g. `bigBed 6+3`; required except for super tracks
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub track_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_label: Option<String>,

    /// Local data file, relative to the definition file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Any other recognized parameter, written as-is
    #[serde(default)]
    pub params: Mapping,

    /// Leaf tags, dimension to tag
    #[serde(default)]
    pub subgroups: Mapping,

    #[serde(default)]
    pub subgroup_definitions: Vec<SubGroupConfig>,

    /// Infer the composite's schema from the tags of its leaves
    #[serde(default)]
    pub derive_subgroups: bool,

    /// View tag, for `view` tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_on: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

/// One dimension of a composite's subgroup schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubGroupConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Tag to title, in display order
    pub mapping: Mapping,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Load and check a hub definition from a YAML file.
///
/// # Arguments
///
/// * `config_path` - Path to the `hub.yaml` file
///
/// # Returns
///
/// * `Ok(HubConfig)` - Parsed definition with `base_dir` set to the file's directory
/// * `Err(HubError::ConfigError)` - Unreadable file, invalid YAML or missing fields
///
/// # Example
///
/// ```rust,ignore
/// use trackhub_libs::load_hub_config;
///
/// let config = load_hub_config("./hubs/my-hub/hub.yaml")?;
/// let (tree, hub) = config.build()?;
/// ```
pub fn load_hub_config<P: AsRef<Path>>(config_path: P) -> Result<HubConfig, HubError> {
    let path = config_path.as_ref();

    // Read file contents
    let contents = fs::read_to_string(path).map_err(|e| {
        HubError::ConfigError(format!("Failed to read hub definition at {:?}: {}", path, e))
    })?;

    // Parse YAML
    let mut config: HubConfig = serde_yaml::from_str(&contents).map_err(|e| {
        HubError::ConfigError(format!("Failed to parse hub definition YAML at {:?}: {}", path, e))
    })?;

    config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    config.check()?;

    debug!("Loaded hub definition '{}' from {:?}", config.hub.name, path);
    Ok(config)
}

impl HubConfig {
    /// Write this definition as YAML, e.g. to snapshot a generated hub.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), HubError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)?;
        info!("Saved hub definition '{}' to {:?}", self.hub.name, path.as_ref());
        Ok(())
    }

    /// Check required fields
    pub fn check(&self) -> Result<(), HubError> {
        if self.hub.name.is_empty() {
            return Err(HubError::ConfigError("hub.name cannot be empty".to_string()));
        }
        if self.hub.email.is_empty() {
            return Err(HubError::ConfigError("hub.email cannot be empty".to_string()));
        }
        if self.genomes.is_empty() {
            return Err(HubError::ConfigError(format!(
                "hub '{}' defines no genomes",
                self.hub.name
            )));
        }
        for genome in &self.genomes {
            if genome.name.is_empty() {
                return Err(HubError::ConfigError("genome name cannot be empty".to_string()));
            }
            for track in &genome.tracks {
                track.check(&genome.name)?;
            }
        }
        Ok(())
    }

    /// Build the tree this definition describes.
    ///
    /// # Returns
    ///
    /// * `Ok((HubTree, NodeId))` - The tree and the id of its hub node
    /// * `Err(HubError)` - A name, parameter or structure the tree rejects
    pub fn build(&self) -> Result<(HubTree, NodeId), HubError> {
        let mut tree = HubTree::new();
        let section = &self.hub;

        let short_label = section.short_label.as_deref().unwrap_or(&section.name);
        let long_label = section.long_label.as_deref().unwrap_or(short_label);
        let hub = tree.hub(&section.name, short_label, long_label, &section.email)?;
        if let Some(url) = &section.description_url {
            tree.add_params(hub, [("descriptionUrl", url)])?;
        }
        if let Some(filename) = &section.filename {
            tree.set_filename_override(hub, filename)?;
        }

        let collection = tree.genome_collection()?;
        tree.add_child(hub, collection)?;

        for genome_config in &self.genomes {
            let genome = tree.genome(&genome_config.name)?;
            if let Some(two_bit) = &genome_config.two_bit {
                tree.set_two_bit(genome, self.resolve(two_bit))?;
            }
            tree.add_params(genome, scalar_pairs(&genome_config.params)?)?;
            if let Some(html) = &genome_config.html {
                tree.set_html(genome, html.clone())?;
            }
            if !genome_config.groups.is_empty() {
                let groups = GroupCollection::try_from(genome_config.groups.clone())?;
                tree.attach_groups(genome, groups)?;
            }

            let trackdb = tree.trackdb()?;
            tree.add_child(collection, genome)?;
            tree.add_child(genome, trackdb)?;

            for track in &genome_config.tracks {
                let id = self.build_track(&mut tree, track)?;
                tree.add_child(trackdb, id)?;
            }
        }

        info!(
            "Built hub '{}' with {} genome(s) and {} node(s)",
            section.name,
            self.genomes.len(),
            tree.len()
        );
        Ok((tree, hub))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn build_track(&self, tree: &mut HubTree, config: &TrackConfig) -> Result<NodeId, HubError> {
        let kind = NodeKind::from(config.kind);
        let id = tree.create(kind, config.name.clone())?;

        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(track_type) = &config.track_type {
            params.push(("type".to_string(), track_type.clone()));
        }
        if let Some(label) = &config.short_label {
            params.push(("shortLabel".to_string(), label.clone()));
        }
        if let Some(label) = config.long_label.as_ref().or(config.short_label.as_ref()) {
            params.push(("longLabel".to_string(), label.clone()));
        }
        for (key, value) in scalar_pairs(&config.params)? {
            // Colors may be given as `#rrggbb`
            let value = if key == "color" && value.starts_with('#') {
                helpers::hex_to_rgb(&value)?
            } else {
                value
            };
            params.push((key, value));
        }
        tree.add_params(id, params)?;

        if let Some(source) = &config.source {
            tree.set_source(id, self.resolve(source))?;
        }
        if let Some(url) = &config.url {
            tree.set_url(id, url)?;
        }
        if let Some(filename) = &config.filename {
            tree.set_filename(id, filename)?;
        }
        if !config.subgroups.is_empty() {
            tree.set_subgroups(id, scalar_pairs(&config.subgroups)?)?;
        }
        if let Some(on) = config.parent_on {
            tree.set_parent_on(id, on)?;
        }
        if let Some(html) = &config.html {
            tree.set_html(id, html.clone())?;
        }

        match kind {
            NodeKind::ViewTrack => {
                let view = config.view.as_deref().unwrap_or(&config.name);
                tree.set_view(id, view)?;
            }
            NodeKind::AggregateTrack => {
                tree.set_aggregate(id, config.aggregate.unwrap_or(AggregateMode::TransparentOverlay))?;
            }
            NodeKind::CompositeTrack => {
                for definition in &config.subgroup_definitions {
                    tree.add_subgroup_definition(id, definition.to_definition()?)?;
                }
                if config.derive_subgroups {
                    let tags = leaf_tags(config)?;
                    let derived = helpers::derive_subgroups(tags.iter().map(Vec::as_slice))?;
                    if !derived.is_empty() && !tree[id].params().contains("dimensions") {
                        let mut extra = vec![(
                            "dimensions".to_string(),
                            helpers::dimensions_from_subgroups(&derived),
                        )];
                        if let Some(filter) = helpers::filter_composite_from_subgroups(&derived) {
                            extra.push(("filterComposite".to_string(), filter));
                        }
                        tree.add_params(id, extra)?;
                    }
                    for definition in derived {
                        tree.add_subgroup_definition(id, definition)?;
                    }
                }
            }
            _ => {}
        }

        for child in &config.tracks {
            let child_id = self.build_track(tree, child)?;
            tree.add_child(id, child_id)?;
        }
        Ok(id)
    }
}

impl TrackConfig {
    fn check(&self, genome: &str) -> Result<(), HubError> {
        if self.name.is_empty() {
            return Err(HubError::ConfigError(format!(
                "a track in genome '{}' has an empty name",
                genome
            )));
        }
        if self.kind != TrackKind::Super && self.track_type.is_none() {
            return Err(HubError::ConfigError(format!(
                "track '{}' needs a type",
                self.name
            )));
        }
        if self.kind == TrackKind::Track && !self.tracks.is_empty() {
            return Err(HubError::ConfigError(format!(
                "plain track '{}' cannot contain tracks; use kind composite, super, aggregate or view",
                self.name
            )));
        }
        for child in &self.tracks {
            child.check(genome)?;
        }
        Ok(())
    }
}

impl SubGroupConfig {
    fn to_definition(&self) -> Result<SubGroupDefinition, HubError> {
        let label = self.label.as_deref().unwrap_or(&self.name);
        let definition = SubGroupDefinition::new(&*self.name, label, scalar_pairs(&self.mapping)?)?;
        match &self.default {
            Some(tag) => definition.with_default(tag.clone()),
            None => Ok(definition),
        }
    }
}

/// Tags of every leaf below a configured composite
fn leaf_tags(config: &TrackConfig) -> Result<Vec<Vec<(String, String)>>, HubError> {
    let mut tags = Vec::new();
    for child in &config.tracks {
        if child.kind == TrackKind::Track {
            tags.push(scalar_pairs(&child.subgroups)?);
        } else {
            tags.extend(leaf_tags(child)?);
        }
    }
    Ok(tags)
}

/// Flatten a YAML mapping of scalars into ordered string pairs
fn scalar_pairs(mapping: &Mapping) -> Result<Vec<(String, String)>, HubError> {
    mapping
        .iter()
        .map(|(key, value)| Ok((scalar(key)?, scalar(value)?)))
        .collect()
}

fn scalar(value: &Value) -> Result<String, HubError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(HubError::ConfigError(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;
    use crate::validate::validate;
    use std::path::Path;
    use tempfile::TempDir;

    const DEFINITION: &str = r##"
hub:
  name: labHub
  short_label: Lab hub
  email: lab@example.org
genomes:
  - name: hg38
    groups:
      - name: signal
        label: Signal tracks
        priority: 1
    tracks:
      - name: signal
        kind: composite
        type: bigWig
        derive_subgroups: true
        params:
          group: signal
          visibility: full
          color: "#ff0033"
        tracks:
          - name: k562_signal
            type: bigWig
            source: data/k562.bw
            subgroups:
              cell: k562
          - name: hela_signal
            type: bigWig
            url: https://example.org/hela.bw
            subgroups:
              cell: hela
      - name: reads
        type: bam
        source: /abs/reads.bam
        params:
          minAliQual: 20
"##;

    fn write_definition(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hub.yaml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_and_build() {
        let (dir, path) = write_definition(DEFINITION);
        let config = load_hub_config(&path).unwrap();
        assert_eq!(config.base_dir, dir.path());

        let (tree, hub) = config.build().unwrap();
        assert_eq!(tree[hub].params().get("longLabel"), Some("Lab hub"));

        let leaf = tree.find_by_name(hub, "k562_signal").unwrap();
        assert_eq!(tree[leaf].data().source, Some(dir.path().join("data/k562.bw")));
        let reads = tree.find_by_name(hub, "reads").unwrap();
        assert_eq!(tree[reads].data().source.as_deref(), Some(Path::new("/abs/reads.bam")));
        assert_eq!(tree[reads].params().get("minAliQual"), Some("20"));

        let composite = tree.find_by_name(hub, "signal").unwrap();
        let schema = tree[composite].schema();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].render(), "cell cell hela=hela k562=k562");
        assert_eq!(tree[composite].params().get("color"), Some("255,0,51"));
        assert_eq!(tree[composite].params().get("dimensions"), Some("dimX=cell"));
        assert_eq!(tree[composite].params().get("filterComposite"), None);

        validate(&tree, hub).unwrap();
        let files = render(&tree, hub).unwrap();
        let trackdb = files
            .iter()
            .find(|f| f.path == Path::new("hg38/trackDb.txt"))
            .unwrap();
        assert!(trackdb.contents.contains("    subGroups cell=k562\n"));
        assert!(trackdb.contents.contains("bigDataUrl https://example.org/hela.bw\n"));
        assert!(files.iter().any(|f| f.path == Path::new("hg38/groups.txt")));
    }

    #[test]
    fn test_missing_required_fields() {
        let (_dir, path) = write_definition("hub:\n  name: h\n  email: \"\"\ngenomes: []\n");
        let err = load_hub_config(&path).unwrap_err();
        assert!(err.to_string().contains("hub.email"));

        let (_dir, path) = write_definition("hub:\n  name: h\n  email: a@b.c\n");
        assert!(load_hub_config(&path).unwrap_err().to_string().contains("no genomes"));

        let untyped = "hub:\n  name: h\n  email: a@b.c\ngenomes:\n  - name: hg38\n    tracks:\n      - name: t\n";
        let (_dir, path) = write_definition(untyped);
        assert!(load_hub_config(&path).unwrap_err().to_string().contains("needs a type"));
    }

    #[test]
    fn test_hub_file_override_must_stay_below_staging_root() {
        let escaping = "hub:\n  name: h\n  email: a@b.c\n  filename: ../escaped/hub.txt\n\
genomes:\n  - name: hg38\n    tracks:\n      - name: t\n        type: bigWig\n        url: https://example.org/t.bw\n";
        let (_dir, path) = write_definition(escaping);
        let config = load_hub_config(&path).unwrap();
        assert!(matches!(config.build(), Err(HubError::Parameter(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let (_dir, path) = write_definition("hub: [unclosed");
        assert!(matches!(load_hub_config(&path), Err(HubError::ConfigError(_))));
        assert!(load_hub_config("/definitely/missing/hub.yaml").is_err());
    }

    #[test]
    fn test_build_rejects_bad_names() {
        let yaml = "hub:\n  name: h\n  email: a@b.c\ngenomes:\n  - name: hg38\n    tracks:\n      - name: bad name\n        type: bigWig\n        url: https://x/y.bw\n";
        let (_dir, path) = write_definition(yaml);
        let config = load_hub_config(&path).unwrap();
        assert!(matches!(config.build(), Err(HubError::Parameter(_))));
    }

    #[test]
    fn test_saved_definition_renders_identically() {
        let (dir, path) = write_definition(DEFINITION);
        let config = load_hub_config(&path).unwrap();

        let copy = dir.path().join("copy.yaml");
        config.save(&copy).unwrap();
        let reloaded = load_hub_config(&copy).unwrap();

        let (tree, hub) = config.build().unwrap();
        let (tree2, hub2) = reloaded.build().unwrap();
        let contents = |files: Vec<crate::render::RenderedFile>| {
            files.into_iter().map(|f| (f.path, f.contents)).collect::<Vec<_>>()
        };
        assert_eq!(
            contents(render(&tree, hub).unwrap()),
            contents(render(&tree2, hub2).unwrap())
        );
    }

    #[test]
    fn test_track_kind_serde() {
        let kind: TrackKind = serde_yaml::from_str("aggregate").unwrap();
        assert_eq!(kind, TrackKind::Aggregate);
        assert_eq!(NodeKind::from(kind), NodeKind::AggregateTrack);

        let mode: AggregateMode = serde_yaml::from_str("solidOverlay").unwrap();
        assert_eq!(mode, AggregateMode::SolidOverlay);
    }
}
