//! Serialization of a hub tree into its text files.
//!
//! Rendering is a read-only walk. A hub root yields `hub.txt`, `genomes.txt`
//! and every per-genome file; a trackDb root yields just its `trackDb.txt`.
//! The tree is validated first unless the caller opts out, and no files are
//! returned if anything fails.

use crate::error::{HubError, Rule, ValidationError, Violation};
use crate::layout;
use crate::node::{NodeId, NodeKind};
use crate::tree::HubTree;
use crate::validate::validate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Keys that open every track stanza, right after `track <name>`
const TRACK_PREFIX: &[&str] = &["shortLabel", "longLabel", "type"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Spaces per nesting level in `trackDb.txt`
    pub indent: usize,
    /// Run the validator before rendering
    pub validate: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            validate: true,
        }
    }
}

/// One output file, relative to the staging root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub contents: String,
    /// Node the file was rendered from
    pub node: NodeId,
}

/// Validate and render with default options.
pub fn render(tree: &HubTree, root: NodeId) -> Result<Vec<RenderedFile>, HubError> {
    render_with(tree, root, RenderOptions::default())
}

/// Render the files of a hub or trackDb node.
///
/// # Returns
///
/// * `Ok(Vec<RenderedFile>)` - Files in a stable order: hub, genomes, then per
///   genome its trackDb, groups and documentation files
/// * `Err(HubError::Validation)` - The subtree is invalid
/// * `Err(HubError::Structure)` - `root` is neither a Hub nor a TrackDb
pub fn render_with(
    tree: &HubTree,
    root: NodeId,
    options: RenderOptions,
) -> Result<Vec<RenderedFile>, HubError> {
    let node = tree
        .get(root)
        .ok_or_else(|| HubError::Structure(format!("{} does not belong to this tree", root)))?;

    if !matches!(node.kind(), NodeKind::Hub | NodeKind::TrackDb) {
        return Err(HubError::Structure(format!(
            "cannot render from {} '{}'; start at a Hub or a TrackDb",
            node.kind(),
            node.name()
        )));
    }

    if options.validate {
        validate(tree, root)?;
    }

    let renderer = Renderer { tree, options };
    let files = match node.kind() {
        NodeKind::Hub => renderer.hub(root)?,
        _ => vec![renderer.trackdb(root)?],
    };

    info!("Rendered {} file(s) from '{}'", files.len(), node.name());
    Ok(files)
}

struct Renderer<'a> {
    tree: &'a HubTree,
    options: RenderOptions,
}

impl Renderer<'_> {
    /// Fail unless the node can be rendered without emitting a broken stanza.
    ///
    /// Only reached with `validate: false`; a validated tree always passes.
    fn require(&self, id: NodeId) -> Result<(), HubError> {
        let node = &self.tree[id];
        let mut rule = node
            .kind()
            .required_params()
            .iter()
            .find(|key| !node.params().contains(key))
            .map(|key| Rule::MissingParameter(key.to_string()));
        if rule.is_none() && node.kind() == NodeKind::Track && !node.data().is_set() {
            rule = Some(Rule::MissingDataFile);
        }

        match rule {
            Some(rule) => Err(ValidationError {
                violations: vec![Violation {
                    node: id,
                    name: node.name().to_string(),
                    kind: node.kind(),
                    rule,
                }],
            }
            .into()),
            None => Ok(()),
        }
    }

    fn single_child(&self, id: NodeId, kind: NodeKind) -> Result<NodeId, HubError> {
        self.tree[id]
            .children()
            .iter()
            .copied()
            .find(|c| self.tree[*c].kind() == kind)
            .ok_or_else(|| {
                HubError::Structure(format!(
                    "'{}' has no {} child",
                    self.tree[id].name(),
                    kind
                ))
            })
    }

    fn hub(&self, hub: NodeId) -> Result<Vec<RenderedFile>, HubError> {
        self.require(hub)?;
        let collection = self.single_child(hub, NodeKind::GenomeCollection)?;

        let hub_path = layout::hub_file(self.tree, hub);
        let genomes_path = layout::genomes_file(self.tree, collection);

        let node = &self.tree[hub];
        let mut lines = vec![format!("hub {}", node.name())];
        for key in ["shortLabel", "longLabel"] {
            if let Some(value) = node.params().get(key) {
                lines.push(format!("{} {}", key, value));
            }
        }
        lines.push(format!(
            "genomesFile {}",
            layout::relpath(&dir_of(&hub_path), &genomes_path)
        ));
        for (key, value) in node.params().ordered(&["email"]) {
            if key != "shortLabel" && key != "longLabel" {
                lines.push(format!("{} {}", key, value));
            }
        }

        let mut files = vec![RenderedFile {
            path: hub_path,
            contents: stanza(&lines, ""),
            node: hub,
        }];

        let genomes = self.tree[collection].children();
        let mut stanzas = Vec::with_capacity(genomes.len());
        let mut genome_files = Vec::new();
        for genome in genomes {
            stanzas.push(self.genome_stanza(*genome, &genomes_path)?);
            genome_files.extend(self.genome_files(*genome)?);
        }

        files.push(RenderedFile {
            path: genomes_path,
            contents: stanzas.join("\n"),
            node: collection,
        });
        files.extend(genome_files);
        Ok(files)
    }

    fn genome_stanza(&self, genome: NodeId, genomes_path: &Path) -> Result<String, HubError> {
        let trackdb = self.single_child(genome, NodeKind::TrackDb)?;
        let dir = dir_of(genomes_path);
        let node = &self.tree[genome];

        let mut lines = vec![
            format!("genome {}", node.name()),
            format!(
                "trackDb {}",
                layout::relpath(&dir, &layout::trackdb_file(self.tree, trackdb))
            ),
        ];
        if node.is_assembly() {
            lines.push(format!(
                "twoBitPath {}",
                layout::relpath(&dir, &layout::two_bit_file(self.tree, genome))
            ));
        }
        if self.tree.groups(genome).is_some() {
            lines.push(format!(
                "groups {}",
                layout::relpath(&dir, &layout::groups_file(self.tree, genome))
            ));
        }

        let mut params: Vec<(&str, &str)> = node.params().iter().collect();
        params.sort_by(|a, b| key_order(a.0).cmp(&key_order(b.0)));
        lines.extend(params.into_iter().map(|(k, v)| format!("{} {}", k, v)));

        if node.html().is_some() {
            lines.push(format!(
                "htmlDocumentation {}",
                layout::relpath(&dir, &layout::genome_html_file(self.tree, genome))
            ));
        }
        Ok(stanza(&lines, ""))
    }

    fn genome_files(&self, genome: NodeId) -> Result<Vec<RenderedFile>, HubError> {
        let trackdb = self.single_child(genome, NodeKind::TrackDb)?;
        let mut files = vec![self.trackdb(trackdb)?];

        if let Some(groups) = self.tree.groups(genome) {
            files.push(RenderedFile {
                path: layout::groups_file(self.tree, genome),
                contents: groups.render(),
                node: genome,
            });
        }
        if let Some(html) = self.tree[genome].html() {
            files.push(RenderedFile {
                path: layout::genome_html_file(self.tree, genome),
                contents: html.to_string(),
                node: genome,
            });
        }
        for (id, _) in self.tree.walk(trackdb) {
            if let Some(html) = self.tree[id].html() {
                files.push(RenderedFile {
                    path: layout::track_html_file(self.tree, id),
                    contents: html.to_string(),
                    node: id,
                });
            }
        }
        Ok(files)
    }

    fn trackdb(&self, trackdb: NodeId) -> Result<RenderedFile, HubError> {
        let path = layout::trackdb_file(self.tree, trackdb);
        let trackdb_dir = dir_of(&path);

        let mut stanzas = Vec::new();
        for (id, depth) in self.tree.walk(trackdb).skip(1) {
            let indent = " ".repeat(self.options.indent * (depth - 1));
            stanzas.push(stanza(&self.track_lines(id, &trackdb_dir)?, &indent));
        }

        debug!("Rendered {} stanza(s) into {:?}", stanzas.len(), path);
        Ok(RenderedFile {
            path,
            contents: stanzas.join("\n"),
            node: trackdb,
        })
    }

    /// Lines of one track stanza, unindented.
    fn track_lines(&self, id: NodeId, trackdb_dir: &Path) -> Result<Vec<String>, HubError> {
        self.require(id)?;
        let tree = self.tree;
        let node = &tree[id];
        let kind = node.kind();

        let mut lines = vec![format!("track {}", node.name())];
        for key in TRACK_PREFIX {
            if let Some(value) = node.params().get(key) {
                lines.push(format!("{} {}", key, value));
            }
        }

        let mut rest: Vec<(String, String)> = node
            .params()
            .iter()
            .filter(|(k, _)| !TRACK_PREFIX.contains(k))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        if let Some(parent) = node.parent().filter(|p| tree[*p].kind().is_track()) {
            let value = match node.parent_on() {
                Some(true) => format!("{} on", tree[parent].name()),
                Some(false) => format!("{} off", tree[parent].name()),
                None => tree[parent].name().to_string(),
            };
            rest.push(("parent".to_string(), value));
        }

        match kind {
            NodeKind::Track => {
                if let Some(value) = self.subgroup_tags(id) {
                    rest.push(("subGroups".to_string(), value));
                }
            }
            NodeKind::CompositeTrack => {
                for (n, definition) in self.schema_lines(id).into_iter().enumerate() {
                    rest.push((format!("subGroup{}", n + 1), definition));
                }
            }
            NodeKind::ViewTrack => {
                if let Some(view) = node.view() {
                    rest.push(("view".to_string(), view.to_string()));
                }
            }
            NodeKind::AggregateTrack => {
                if let Some(mode) = node.aggregate() {
                    rest.push(("aggregate".to_string(), mode.as_str().to_string()));
                }
            }
            _ => {}
        }

        if node.html().is_some() && !node.params().contains("html") {
            let html = layout::track_html_file(tree, id);
            rest.push(("html".to_string(), layout::relpath(trackdb_dir, &html)));
        }

        rest.sort_by(|a, b| key_order(&a.0).cmp(&key_order(&b.0)));
        lines.extend(rest.into_iter().map(|(k, v)| format!("{} {}", k, v)));

        if let Some(trailer) = kind.trailer() {
            lines.push(trailer.to_string());
        }

        if kind == NodeKind::Track {
            let url = layout::big_data_url(tree, id).ok_or_else(|| {
                HubError::Structure(format!("track '{}' has no data file", node.name()))
            })?;
            lines.push(format!("bigDataUrl {}", url));
        }
        Ok(lines)
    }

    /// `subGroups` value of a leaf inside a composite
    fn subgroup_tags(&self, id: NodeId) -> Option<String> {
        let tree = self.tree;
        let composite = tree.ancestor_of_kind(id, NodeKind::CompositeTrack)?;
        let view = tree
            .ancestor_of_kind(id, NodeKind::ViewTrack)
            .and_then(|v| tree[v].view());

        let mut tags: Vec<String> = Vec::new();
        if let Some(view) = view {
            tags.push(format!("view={}", view));
        }
        for definition in tree[composite].schema() {
            let tag = tree[id]
                .subgroups()
                .iter()
                .find(|(d, _)| d == definition.name())
                .map(|(_, t)| t.as_str())
                .or(definition.default_tag());
            if let Some(tag) = tag {
                tags.push(format!("{}={}", definition.name(), tag));
            }
        }

        if tags.is_empty() { None } else { Some(tags.join(" ")) }
    }

    /// `subGroupN` values of a composite, the automatic view dimension first
    fn schema_lines(&self, composite: NodeId) -> Vec<String> {
        let tree = self.tree;
        let views: Vec<&str> = tree[composite]
            .children()
            .iter()
            .filter_map(|c| tree[*c].view())
            .collect();

        let mut lines = Vec::new();
        if !views.is_empty() {
            let mapping: Vec<String> = views.iter().map(|v| format!("{}={}", v, v)).collect();
            lines.push(format!("view Views {}", mapping.join(" ")));
        }
        lines.extend(tree[composite].schema().iter().map(|d| d.render()));
        lines
    }
}

/// Sort key placing `subGroup2` before `subGroup10`
fn key_order(key: &str) -> (&str, u64) {
    let prefix = key.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = key[prefix.len()..].parse().unwrap_or(0);
    (prefix, number)
}

fn stanza(lines: &[String], indent: &str) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(indent);
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn dir_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{GroupCollection, GroupDefinition, SubGroupDefinition};
    use crate::node::AggregateMode;
    use crate::tree::DefaultHub;

    fn file<'a>(files: &'a [RenderedFile], path: &str) -> &'a str {
        files
            .iter()
            .find(|f| f.path == Path::new(path))
            .map(|f| f.contents.as_str())
            .unwrap_or_else(|| panic!("no file {}", path))
    }

    fn hub_with_leaf() -> (HubTree, DefaultHub, NodeId) {
        let (mut tree, ids) = HubTree::default_hub("myHub", "hg38", "me@example.com").unwrap();
        let track = tree.track("reads", "bigWig").unwrap();
        tree.set_source(track, "/data/reads.bw").unwrap();
        tree.add_child(ids.trackdb, track).unwrap();
        (tree, ids, track)
    }

    #[test]
    fn test_minimal_hub() {
        let (tree, ids, _) = hub_with_leaf();
        let files = render(&tree, ids.hub).unwrap();

        let paths: Vec<&Path> = files.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(
            paths,
            vec![
                Path::new("hub.txt"),
                Path::new("genomes.txt"),
                Path::new("hg38/trackDb.txt")
            ]
        );

        assert_eq!(
            file(&files, "hub.txt"),
            "hub myHub\nshortLabel myHub\nlongLabel myHub\ngenomesFile genomes.txt\nemail me@example.com\n"
        );
        assert_eq!(file(&files, "genomes.txt"), "genome hg38\ntrackDb hg38/trackDb.txt\n");
        assert_eq!(
            file(&files, "hg38/trackDb.txt"),
            "track reads\nshortLabel reads\nlongLabel reads\ntype bigWig\nbigDataUrl reads.bigWig\n"
        );
    }

    #[test]
    fn test_key_order_and_trailers() {
        let (mut tree, ids, _) = hub_with_leaf();
        let agg = tree
            .aggregate("overlay", "bigWig", AggregateMode::TransparentOverlay)
            .unwrap();
        tree.add_params(agg, [("visibility", "full"), ("autoScale", "on")]).unwrap();
        let member = tree.track("member", "bigWig").unwrap();
        tree.set_url(member, "https://example.org/m.bw").unwrap();
        tree.add_params(member, [("color", "255,0,0")]).unwrap();
        tree.set_parent_on(member, false).unwrap();
        tree.add_child(ids.trackdb, agg).unwrap();
        tree.add_child(agg, member).unwrap();

        let files = render(&tree, ids.hub).unwrap();
        let expected = "\
track reads
shortLabel reads
longLabel reads
type bigWig
bigDataUrl reads.bigWig

track overlay
shortLabel overlay
longLabel overlay
type bigWig
aggregate transparentOverlay
autoScale on
visibility full
container multiWig

    track member
    shortLabel member
    longLabel member
    type bigWig
    color 255,0,0
    parent overlay off
    bigDataUrl https://example.org/m.bw
";
        assert_eq!(file(&files, "hg38/trackDb.txt"), expected);
    }

    #[test]
    fn test_composite_with_views() {
        let (mut tree, ids) = HubTree::default_hub("h", "hg38", "a@b.c").unwrap();
        let comp = tree.composite("comp", "bigBed").unwrap();
        tree.add_subgroup_definition(
            comp,
            SubGroupDefinition::new("cell", "Cell Line", [("k562", "K562"), ("hela", "HeLa")])
                .unwrap(),
        )
        .unwrap();
        let view = tree.view("compPeaks", "peaks", "bigBed").unwrap();
        let leaf = tree.track("k562_peaks", "bigBed").unwrap();
        tree.set_source(leaf, "/data/k.bb").unwrap();
        tree.set_subgroups(leaf, [("cell", "k562")]).unwrap();
        tree.add_child(ids.trackdb, comp).unwrap();
        tree.add_child(comp, view).unwrap();
        tree.add_child(view, leaf).unwrap();

        let files = render_with(&tree, ids.trackdb, RenderOptions { indent: 2, validate: true }).unwrap();
        assert_eq!(files.len(), 1);
        let expected = "\
track comp
shortLabel comp
longLabel comp
type bigBed
subGroup1 view Views peaks=peaks
subGroup2 cell Cell_Line k562=K562 hela=HeLa
compositeTrack on

  track compPeaks
  shortLabel compPeaks
  longLabel compPeaks
  type bigBed
  parent comp
  view peaks

    track k562_peaks
    shortLabel k562_peaks
    longLabel k562_peaks
    type bigBed
    parent compPeaks
    subGroups view=peaks cell=k562
    bigDataUrl k562_peaks.bigBed
";
        assert_eq!(files[0].contents, expected);
    }

    #[test]
    fn test_assembly_groups_and_html() {
        let mut tree = HubTree::new();
        let hub = tree.hub("asmHub", "Assembly hub", "An assembly hub", "a@b.c").unwrap();
        let genomes = tree.genome_collection().unwrap();
        let genome = tree
            .assembly("myAsm", "/data/myAsm.2bit", "Some organism", "chr1:1-1000")
            .unwrap();
        let trackdb = tree.trackdb().unwrap();
        let track = tree.track("genes", "bigBed 12").unwrap();
        tree.set_source(track, "/data/genes.bb").unwrap();
        tree.add_params(track, [("group", "map")]).unwrap();
        tree.set_html(track, "<p>genes</p>\n").unwrap();
        tree.set_html(genome, "<h1>myAsm</h1>\n").unwrap();
        let mut groups = GroupCollection::new();
        groups.add(GroupDefinition::new("map").unwrap().with_label("Mapping")).unwrap();
        tree.attach_groups(genome, groups).unwrap();
        tree.add_child(hub, genomes).unwrap();
        tree.add_child(genomes, genome).unwrap();
        tree.add_child(genome, trackdb).unwrap();
        tree.add_child(trackdb, track).unwrap();

        let files = render(&tree, hub).unwrap();
        assert_eq!(
            file(&files, "genomes.txt"),
            "genome myAsm\ntrackDb myAsm/trackDb.txt\ntwoBitPath myAsm/myAsm.2bit\n\
groups myAsm/groups.txt\ndefaultPos chr1:1-1000\norganism Some organism\n\
htmlDocumentation myAsm/myAsm_info.html\n"
        );
        assert_eq!(
            file(&files, "myAsm/groups.txt"),
            "name map\nlabel Mapping\npriority 1\ndefaultIsClosed 0\n"
        );
        assert_eq!(file(&files, "myAsm/genes.html"), "<p>genes</p>\n");
        assert!(file(&files, "myAsm/trackDb.txt").contains("\nhtml genes.html\n"));
        assert!(file(&files, "hub.txt").contains("shortLabel Assembly hub\n"));
    }

    #[test]
    fn test_refuses_invalid_or_unsupported_roots() {
        let (mut tree, ids, track) = hub_with_leaf();
        assert!(matches!(
            render(&tree, ids.genome).unwrap_err(),
            HubError::Structure(_)
        ));

        tree.remove_params(track, ["longLabel"]).unwrap();
        assert!(matches!(render(&tree, ids.hub).unwrap_err(), HubError::Validation(_)));

        let unchecked = RenderOptions {
            validate: false,
            ..RenderOptions::default()
        };
        let err = render_with(&tree, ids.hub, unchecked).unwrap_err();
        assert_eq!(err.violations()[0].node, track);
    }

    #[test]
    fn test_numbered_keys_sort_numerically() {
        let mut keys = vec!["subGroup10", "subGroups", "subGroup2", "parent", "subGroup1"];
        keys.sort_by_key(|k| key_order(*k));
        assert_eq!(keys, vec!["parent", "subGroup1", "subGroup2", "subGroup10", "subGroups"]);
    }
}
