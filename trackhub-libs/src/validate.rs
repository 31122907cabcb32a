//! Whole-tree validation.
//!
//! A single post-order walk checks every node against its kind's tables and
//! the tree-wide rules. By default every violation is collected and returned
//! in one [`ValidationError`]; fail-fast mode stops at the first one. The walk
//! never mutates the tree.

use crate::error::{HubError, Rule, ValidationError, Violation};
use crate::node::{NodeId, NodeKind};
use crate::params::{base_type, lookup};
use crate::tree::HubTree;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Stop at the first violation
    pub fail_fast: bool,
}

/// Validate the subtree rooted at `root`, collecting every violation.
///
/// # Returns
///
/// * `Ok(())` - The subtree is ready to render
/// * `Err(HubError::Validation)` - Every violation found, in walk order
/// * `Err(HubError::Structure)` - `root` does not belong to the tree
pub fn validate(tree: &HubTree, root: NodeId) -> Result<(), HubError> {
    validate_with(tree, root, ValidateOptions::default())
}

pub fn validate_with(tree: &HubTree, root: NodeId, options: ValidateOptions) -> Result<(), HubError> {
    if tree.get(root).is_none() {
        return Err(HubError::Structure(format!("{} does not belong to this tree", root)));
    }

    let mut validator = Validator {
        tree,
        options,
        violations: Vec::new(),
        names: HashMap::new(),
    };
    // A Stop only means fail-fast found its violation.
    let _ = validator.visit(root, 0);

    debug!(
        "Validated {} '{}': {} violation(s)",
        tree[root].kind(),
        tree[root].name(),
        validator.violations.len()
    );

    if validator.violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            violations: validator.violations,
        }
        .into())
    }
}

struct Stop;

struct Validator<'a> {
    tree: &'a HubTree,
    options: ValidateOptions,
    violations: Vec<Violation>,
    /// Track names seen so far, keyed by their enclosing trackDb
    names: HashMap<(Option<NodeId>, String), NodeId>,
}

impl Validator<'_> {
    fn report(&mut self, id: NodeId, rule: Rule) -> Result<(), Stop> {
        let node = &self.tree[id];
        self.violations.push(Violation {
            node: id,
            name: node.name().to_string(),
            kind: node.kind(),
            rule,
        });
        if self.options.fail_fast { Err(Stop) } else { Ok(()) }
    }

    fn visit(&mut self, id: NodeId, depth: usize) -> Result<(), Stop> {
        let tree = self.tree;
        if depth > crate::tree::MAX_DEPTH {
            return self.report(id, Rule::BrokenLink("tree is deeper than the depth bound".to_string()));
        }
        for child in tree[id].children() {
            self.visit(*child, depth + 1)?;
        }
        self.check_links(id)?;
        self.check_params(id)?;
        self.check_children(id)?;
        self.check_node(id)
    }

    fn check_links(&mut self, id: NodeId) -> Result<(), Stop> {
        let tree = self.tree;
        for child in tree[id].children() {
            if tree[*child].parent() != Some(id) {
                let detail = format!("child '{}' does not point back", tree[*child].name());
                self.report(id, Rule::BrokenLink(detail))?;
            }
        }
        Ok(())
    }

    fn check_params(&mut self, id: NodeId) -> Result<(), Stop> {
        let tree = self.tree;
        let node = &tree[id];
        let kind = node.kind();

        for key in kind.required_params() {
            if !node.params().contains(key) {
                self.report(id, Rule::MissingParameter(key.to_string()))?;
            }
        }
        if node.is_assembly() {
            for key in ["organism", "defaultPos"] {
                if !node.params().contains(key) {
                    self.report(id, Rule::MissingParameter(key.to_string()))?;
                }
            }
        }

        let track_type = node.track_type();
        for (key, value) in node.params().iter() {
            if kind.is_managed_key(key) {
                self.report(id, Rule::ForbiddenParameter(key.to_string()))?;
                continue;
            }
            match lookup(key) {
                Some(spec) if spec.applies_to(kind, track_type, node.is_assembly()) => {
                    if let Err(reason) = spec.check.run(value) {
                        let rule = Rule::InvalidValue {
                            key: key.to_string(),
                            reason,
                        };
                        self.report(id, rule)?;
                    }
                }
                _ => self.report(id, Rule::UnknownParameter(key.to_string()))?,
            }
        }
        Ok(())
    }

    fn check_children(&mut self, id: NodeId) -> Result<(), Stop> {
        let tree = self.tree;
        let node = &tree[id];
        let kind = node.kind();

        for child in node.children() {
            let child_kind = tree[*child].kind();
            if !kind.accepts(child_kind) {
                self.report(id, Rule::ChildKind(child_kind))?;
            }
        }

        if let Some(single) = kind.single_child() {
            let count = node
                .children()
                .iter()
                .filter(|c| tree[**c].kind() == single)
                .count();
            match count {
                0 => self.report(id, Rule::MissingChild(single))?,
                1 => {}
                _ => self.report(id, Rule::TooManyChildren(single))?,
            }
        }

        if kind.must_have_children() && node.children().is_empty() {
            self.report(id, Rule::EmptyContainer)?;
        }

        if matches!(kind, NodeKind::ViewTrack | NodeKind::AggregateTrack) {
            if let Some(expected) = node.track_type().map(base_type) {
                for child in node.children() {
                    if let Some(found) = tree[*child].track_type().map(base_type) {
                        if found != expected {
                            let rule = Rule::TypeMismatch {
                                expected: expected.to_string(),
                                found: found.to_string(),
                            };
                            self.report(*child, rule)?;
                        }
                    }
                }
            }
        }

        if kind == NodeKind::GenomeCollection {
            let mut seen = HashSet::new();
            for child in node.children() {
                let genome = tree[*child].name();
                if !seen.insert(genome) {
                    self.report(*child, Rule::DuplicateGenome(genome.to_string()))?;
                }
            }
        }
        Ok(())
    }

    fn check_node(&mut self, id: NodeId) -> Result<(), Stop> {
        let tree = self.tree;
        let kind = tree[id].kind();
        if !kind.is_track() {
            return Ok(());
        }

        if kind == NodeKind::Track && !tree[id].data().is_set() {
            self.report(id, Rule::MissingDataFile)?;
        }
        if kind == NodeKind::CompositeTrack {
            self.check_schema(id)?;
        }
        if kind == NodeKind::Track {
            self.check_subgroups(id)?;
        }
        self.check_group(id)?;

        let scope = tree.ancestor_of_kind(id, NodeKind::TrackDb);
        let name = tree[id].name().to_string();
        if self.names.insert((scope, name.clone()), id).is_some() {
            self.report(id, Rule::DuplicateName(name))?;
        }
        Ok(())
    }

    fn check_schema(&mut self, id: NodeId) -> Result<(), Stop> {
        let tree = self.tree;
        let node = &tree[id];
        let has_views = node
            .children()
            .iter()
            .any(|c| tree[*c].kind() == NodeKind::ViewTrack);

        let mut seen: HashSet<&str> = HashSet::new();
        if has_views {
            seen.insert("view");
        }
        for definition in node.schema() {
            if !seen.insert(definition.name()) {
                let detail = format!("subgroup '{}' is defined more than once", definition.name());
                self.report(id, Rule::SubgroupMismatch(detail))?;
            }
        }
        Ok(())
    }

    fn check_subgroups(&mut self, id: NodeId) -> Result<(), Stop> {
        let tree = self.tree;
        let node = &tree[id];
        let Some(composite) = tree.ancestor_of_kind(id, NodeKind::CompositeTrack) else {
            if !node.subgroups().is_empty() {
                let detail = "subgroup tags set on a track outside a composite".to_string();
                return self.report(id, Rule::SubgroupMismatch(detail));
            }
            return Ok(());
        };
        let schema = tree[composite].schema();

        for (dimension, tag) in node.subgroups() {
            let detail = match schema.iter().find(|d| d.name() == dimension) {
                None => format!("dimension '{}' is not in the schema of '{}'", dimension, tree[composite].name()),
                Some(definition) if !definition.has_tag(tag) => {
                    format!("tag '{}' is not defined for dimension '{}'", tag, dimension)
                }
                Some(_) => continue,
            };
            self.report(id, Rule::SubgroupMismatch(detail))?;
        }

        for definition in schema {
            let tagged = node.subgroups().iter().any(|(d, _)| d == definition.name());
            if !tagged && definition.default_tag().is_none() {
                let detail = format!("no tag for dimension '{}'", definition.name());
                self.report(id, Rule::SubgroupMismatch(detail))?;
            }
        }
        Ok(())
    }

    fn check_group(&mut self, id: NodeId) -> Result<(), Stop> {
        let tree = self.tree;
        let Some(group) = tree[id].params().get("group") else {
            return Ok(());
        };
        let groups = self
            .tree
            .ancestor_of_kind(id, NodeKind::Genome)
            .and_then(|genome| tree.groups(genome));
        match groups {
            Some(groups) if !groups.contains(group) => {
                self.report(id, Rule::UnknownGroup(group.to_string()))
            }
            _ => Ok(()),
        }
    }
}
