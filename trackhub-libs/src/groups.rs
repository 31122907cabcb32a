//! Track groups and subgroup definitions.
//!
//! Groups are UI sections of a genome's track list and render to
//! `groups.txt`. Subgroup definitions make up a composite track's schema and
//! render as its numbered `subGroupN` lines.

use crate::error::HubError;
use crate::node::check_name;
use serde::{Deserialize, Serialize};

/// One entry of `groups.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub name: String,
    pub label: String,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default)]
    pub default_is_closed: bool,
}

fn default_priority() -> u32 {
    1
}

impl GroupDefinition {
    /// Create a group whose label defaults to its name.
    pub fn new(name: impl Into<String>) -> Result<Self, HubError> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            label: name.clone(),
            name,
            priority: default_priority(),
            default_is_closed: false,
        })
    }

    pub fn with_label(mut self, label: impl AsRef<str>) -> Self {
        self.label = crate::params::sanitize_value(label.as_ref());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn closed(mut self, closed: bool) -> Self {
        self.default_is_closed = closed;
        self
    }

    pub fn render(&self) -> String {
        format!(
            "name {}\nlabel {}\npriority {}\ndefaultIsClosed {}\n",
            self.name,
            self.label,
            self.priority,
            u8::from(self.default_is_closed)
        )
    }
}

/// The groups of one genome, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupCollection {
    groups: Vec<GroupDefinition>,
}

impl GroupCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group, rejecting a name already present.
    pub fn add(&mut self, group: GroupDefinition) -> Result<(), HubError> {
        if self.contains(&group.name) {
            return Err(HubError::Parameter(format!(
                "group '{}' is already defined",
                group.name
            )));
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.name == name)
    }

    pub fn groups(&self) -> &[GroupDefinition] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// `groups.txt` contents, one stanza per group
    pub fn render(&self) -> String {
        self.groups
            .iter()
            .map(GroupDefinition::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TryFrom<Vec<GroupDefinition>> for GroupCollection {
    type Error = HubError;

    fn try_from(groups: Vec<GroupDefinition>) -> Result<Self, Self::Error> {
        let mut collection = GroupCollection::new();
        for group in groups {
            check_name(&group.name)?;
            collection.add(group)?;
        }
        Ok(collection)
    }
}

/// One dimension of a composite track's subgroup schema.
///
/// Renders as `<name> <label> tag=Title tag=Title ...`. Labels and titles
/// cannot contain spaces in the output grammar, so whitespace in them is
/// replaced by underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGroupDefinition {
    name: String,
    label: String,
    mapping: Vec<(String, String)>,
    default: Option<String>,
}

impl SubGroupDefinition {
    /// Create a dimension.
    ///
    /// # Arguments
    ///
    /// * `name` - Dimension name, restricted to `[A-Za-z0-9_]`
    /// * `label` - Display label
    /// * `mapping` - Ordered `(tag, title)` pairs; tags follow the name rules
    ///
    /// # Returns
    ///
    /// * `Err(HubError::Parameter)` for a bad name or tag, an empty mapping or
    ///   a repeated tag
    pub fn new<I, T, L>(
        name: impl Into<String>,
        label: impl AsRef<str>,
        mapping: I,
    ) -> Result<Self, HubError>
    where
        I: IntoIterator<Item = (T, L)>,
        T: Into<String>,
        L: AsRef<str>,
    {
        let name = name.into();
        check_name(&name)?;

        let mut pairs: Vec<(String, String)> = Vec::new();
        for (tag, title) in mapping {
            let tag = tag.into();
            check_name(&tag)?;
            if pairs.iter().any(|(t, _)| *t == tag) {
                return Err(HubError::Parameter(format!(
                    "tag '{}' appears twice in subgroup '{}'",
                    tag, name
                )));
            }
            pairs.push((tag, underscored(title.as_ref())));
        }
        if pairs.is_empty() {
            return Err(HubError::Parameter(format!(
                "subgroup '{}' needs at least one tag",
                name
            )));
        }

        Ok(Self {
            label: underscored(label.as_ref()),
            name,
            mapping: pairs,
            default: None,
        })
    }

    /// Tag used for tracks that do not set this dimension.
    ///
    /// The tag is added to the mapping (titled by itself) when absent.
    pub fn with_default(mut self, tag: impl Into<String>) -> Result<Self, HubError> {
        let tag = tag.into();
        check_name(&tag)?;
        if !self.has_tag(&tag) {
            self.mapping.push((tag.clone(), tag.clone()));
        }
        self.default = Some(tag);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mapping(&self) -> &[(String, String)] {
        &self.mapping
    }

    pub fn default_tag(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.mapping.iter().any(|(t, _)| t == tag)
    }

    /// Value of a `subGroupN` line
    pub fn render(&self) -> String {
        let mut line = format!("{} {}", self.name, self.label);
        for (tag, title) in &self.mapping {
            line.push(' ');
            line.push_str(tag);
            line.push('=');
            line.push_str(title);
        }
        line
    }
}

fn underscored(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join("_")
}
