//! Small pure helpers used while building hubs.

use crate::error::HubError;
use crate::groups::SubGroupDefinition;
use std::collections::{BTreeMap, BTreeSet};

/// How [`sanitize`] treats characters outside `[A-Za-z0-9_]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Drop them silently
    Strip,
    /// Fail on the first one
    Reject,
}

/// Restrict a string to the name alphabet `[A-Za-z0-9_]`.
///
/// Spaces become underscores first, in both modes.
///
/// # Example
/// ```
/// use trackhub_libs::helpers::{sanitize, SanitizeMode};
/// assert_eq!(sanitize("my track (v2)", SanitizeMode::Strip).unwrap(), "my_track_v2");
/// assert!(sanitize("my track (v2)", SanitizeMode::Reject).is_err());
/// ```
pub fn sanitize(text: &str, mode: SanitizeMode) -> Result<String, HubError> {
    let spaced = text.replace(' ', "_");
    let allowed = |c: &char| c.is_ascii_alphanumeric() || *c == '_';

    let cleaned: String = match mode {
        SanitizeMode::Strip => spaced.chars().filter(allowed).collect(),
        SanitizeMode::Reject => {
            if let Some(bad) = spaced.chars().find(|c| !allowed(c)) {
                return Err(HubError::Parameter(format!(
                    "'{}' contains disallowed character '{}'",
                    text, bad
                )));
            }
            spaced
        }
    };

    if cleaned.is_empty() {
        return Err(HubError::Parameter(format!(
            "'{}' has no characters left after sanitizing",
            text
        )));
    }
    Ok(cleaned)
}

/// Convert `#rrggbb` to the `r,g,b` form used by color parameters.
///
/// # Example
/// ```
/// use trackhub_libs::helpers::hex_to_rgb;
/// assert_eq!(hex_to_rgb("#ff0033").unwrap(), "255,0,51");
/// ```
pub fn hex_to_rgb(hex: &str) -> Result<String, HubError> {
    let invalid = || HubError::Parameter(format!("'{}' does not look like a hex color", hex));

    let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
    };
    Ok(format!("{},{},{}", channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Infer a subgroup schema from per-track tag maps.
///
/// One definition per dimension, dimensions and tags sorted, each tag titled
/// by itself. Dimensions that some tracks leave unset get a `none` default.
pub fn derive_subgroups<'a, I>(tag_maps: I) -> Result<Vec<SubGroupDefinition>, HubError>
where
    I: IntoIterator<Item = &'a [(String, String)]>,
{
    let maps: Vec<&[(String, String)]> = tag_maps.into_iter().collect();

    let mut dimensions: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for map in &maps {
        for (dimension, tag) in map.iter() {
            dimensions.entry(dimension.as_str()).or_default().insert(tag.as_str());
        }
    }

    dimensions
        .into_iter()
        .map(|(dimension, tags)| {
            let definition = SubGroupDefinition::new(
                dimension,
                dimension,
                tags.iter().map(|tag| (*tag, *tag)),
            )?;
            let everywhere = maps
                .iter()
                .all(|map| map.iter().any(|(d, _)| d == dimension));
            if everywhere {
                Ok(definition)
            } else {
                definition.with_default("none")
            }
        })
        .collect()
}

const DIMENSION_LETTERS: &str = "XYABCDEFGHIJKLMNOPQRSTUVWZ";

/// Value for a composite's `dimensions` parameter: `dimX=a dimY=b dimA=c ...`
pub fn dimensions_from_subgroups(subgroups: &[SubGroupDefinition]) -> String {
    DIMENSION_LETTERS
        .chars()
        .zip(subgroups)
        .map(|(letter, sg)| format!("dim{}={}", letter, sg.name()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Value for a composite's `filterComposite` parameter.
///
/// Only dimensions from the third on are filterable; `None` when there are
/// fewer than three.
pub fn filter_composite_from_subgroups(subgroups: &[SubGroupDefinition]) -> Option<String> {
    let dims: Vec<String> = DIMENSION_LETTERS[2..]
        .chars()
        .zip(subgroups.iter().skip(2))
        .map(|(letter, _)| format!("dim{}", letter))
        .collect();
    if dims.is_empty() {
        None
    } else {
        Some(dims.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(d, t)| (d.to_string(), t.to_string()))
            .collect()
    }

    fn def(name: &str) -> SubGroupDefinition {
        SubGroupDefinition::new(name, name, [("a", "a")]).unwrap()
    }

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#ff0033").unwrap(), "255,0,51");
        assert_eq!(hex_to_rgb("#000000").unwrap(), "0,0,0");
        assert!(hex_to_rgb("ff0033").is_err());
        assert!(hex_to_rgb("#ff003").is_err());
        assert!(hex_to_rgb("#gg0033").is_err());
        assert!(hex_to_rgb("#+f+f+f").is_err());
        assert!(hex_to_rgb("#FF0033").is_ok());
    }

    #[test]
    fn test_sanitize_strip() {
        assert_eq!(sanitize("a b-c.d", SanitizeMode::Strip).unwrap(), "a_bcd");
        assert!(sanitize("...", SanitizeMode::Strip).is_err());
    }

    #[test]
    fn test_sanitize_reject() {
        assert_eq!(sanitize("a b", SanitizeMode::Reject).unwrap(), "a_b");
        assert!(sanitize("a.b", SanitizeMode::Reject).is_err());
    }

    #[test]
    fn test_derive_subgroups() {
        let one = tags(&[("cell", "k562"), ("factor", "ctcf")]);
        let two = tags(&[("cell", "gm12878")]);

        let schema = derive_subgroups([one.as_slice(), two.as_slice()]).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].render(), "cell cell gm12878=gm12878 k562=k562");
        assert_eq!(schema[0].default_tag(), None);
        assert_eq!(schema[1].name(), "factor");
        assert_eq!(schema[1].default_tag(), Some("none"));
    }

    #[test]
    fn test_dimensions_from_subgroups() {
        let schema = vec![def("cell"), def("ab"), def("lab")];
        assert_eq!(
            dimensions_from_subgroups(&schema),
            "dimX=cell dimY=ab dimA=lab"
        );
    }

    #[test]
    fn test_filter_composite_from_subgroups() {
        let schema = vec![def("cell"), def("ab"), def("lab"), def("knockdown")];
        assert_eq!(
            filter_composite_from_subgroups(&schema),
            Some("dimA dimB".to_string())
        );
        assert_eq!(filter_composite_from_subgroups(&schema[..2]), None);
    }
}
