//! Parameter storage and the recognized-options table.
//!
//! Every node carries a [`ParameterStore`]: an ordered bag of `key value`
//! pairs that end up as lines in the rendered files. The store itself only
//! checks that keys are well formed. Which keys a node kind accepts, and what
//! their values must look like, is described by the [`RECOGNIZED`] table and
//! enforced by [`check_value`] (at set time) and by the validator.

use crate::error::HubError;
use crate::node::NodeKind;
use regex::Regex;
use std::sync::LazyLock;

/// Ordered key/value bag attached to every node.
///
/// Keys keep their first-insertion position; overwriting a key updates the
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterStore {
    entries: Vec<(String, String)>,
}

impl ParameterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a parameter.
    ///
    /// The value is whitespace-sanitized: runs of spaces, tabs and newlines
    /// collapse to a single space and the ends are trimmed, so a value can
    /// never break the one-line-per-key grammar.
    ///
    /// # Arguments
    ///
    /// * `key` - Parameter name, non-empty and without whitespace
    /// * `value` - Parameter value
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the key was accepted
    /// * `Err(HubError::Parameter)` if the key is empty or contains whitespace
    pub fn set(&mut self, key: impl Into<String>, value: impl AsRef<str>) -> Result<(), HubError> {
        let key = key.into();
        check_key(&key)?;
        let value = sanitize_value(value.as_ref());

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a parameter is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove a parameter. Absent keys are a no-op.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Apply every entry of `other`; on conflicts `other` wins.
    pub fn merge(&mut self, other: &ParameterStore) {
        for (key, value) in &other.entries {
            match self.entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.clone(),
                None => self.entries.push((key.clone(), value.clone())),
            }
        }
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parameter names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with the `canonical` keys promoted to the front, in canonical
    /// order, followed by every other key in insertion order.
    pub fn ordered<'a>(&'a self, canonical: &[&str]) -> Vec<(&'a str, &'a str)> {
        let mut ordered: Vec<(&str, &str)> = canonical
            .iter()
            .filter_map(|key| {
                self.entries
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(k, v)| (k.as_str(), v.as_str()))
            })
            .collect();

        ordered.extend(
            self.entries
                .iter()
                .filter(|(k, _)| !canonical.contains(&k.as_str()))
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        ordered
    }
}

fn check_key(key: &str) -> Result<(), HubError> {
    if key.is_empty() {
        return Err(HubError::Parameter("parameter key cannot be empty".to_string()));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(HubError::Parameter(format!(
            "parameter key '{}' contains whitespace",
            key
        )));
    }
    Ok(())
}

/// Collapse whitespace runs to single spaces and trim the ends
pub fn sanitize_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Where a recognized parameter may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Any track-family node
    AnyTrack,
    /// Track-family nodes whose `type` belongs to this family
    TrackType(&'static str),
    Composite,
    View,
    Aggregate,
    /// Any genome stanza
    Genome,
    /// Genome stanzas backed by a two-bit file
    Assembly,
    Hub,
}

/// Value format of a recognized parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Text,
    OneOf(&'static [&'static str]),
    /// `r,g,b` with each component in 0..=255
    Rgb,
    /// two RGB triples separated by a space
    RgbPair,
    Int,
    Float,
    /// `a:b` with numeric parts
    Pair,
    /// `a:b:c` with numeric parts
    Triple,
    /// `min:max` or a single number
    RangeOrNumber,
    /// `chrom:start-end` with start < end
    Position,
    /// `off` or an integer
    OffOrInt,
    /// whitespace-separated `key=value` items
    KeyVal,
    /// track type whose first word is a known type
    TrackType,
}

/// One row of the recognized-options table.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub scopes: &'static [Scope],
    pub check: Check,
}

const ON: &[&str] = &["on"];
const ON_OFF: &[&str] = &["on", "off"];
const TRUE_FALSE: &[&str] = &["true", "false"];

/// Track types accepted in the first word of `type`.
pub const TRACK_TYPES: &[&str] = &[
    "bam",
    "bigBarChart",
    "bigBed",
    "bigChain",
    "bigGenePred",
    "bigInteract",
    "bigLolly",
    "bigMaf",
    "bigNarrowPeak",
    "bigPsl",
    "bigWig",
    "halSnake",
    "hic",
    "vcfPhasedTrio",
    "vcfTabix",
];

/// Types that accept the bigBed display options.
const BED_FAMILY: &[&str] = &[
    "bigBed",
    "bigBarChart",
    "bigChain",
    "bigGenePred",
    "bigInteract",
    "bigLolly",
    "bigMaf",
    "bigNarrowPeak",
    "bigPsl",
];

const fn spec(name: &'static str, scopes: &'static [Scope], check: Check) -> ParamSpec {
    ParamSpec { name, scopes, check }
}

use Scope::*;

/// Every parameter the builder recognizes.
pub static RECOGNIZED: &[ParamSpec] = &[
    // Common track settings
    spec("shortLabel", &[AnyTrack, Hub], Check::Text),
    spec("longLabel", &[AnyTrack, Hub], Check::Text),
    spec("type", &[AnyTrack], Check::TrackType),
    spec("visibility", &[AnyTrack], Check::OneOf(&["hide", "dense", "squish", "pack", "full"])),
    spec("color", &[AnyTrack], Check::Rgb),
    spec("altColor", &[AnyTrack], Check::Rgb),
    spec("priority", &[AnyTrack], Check::Float),
    spec("group", &[AnyTrack], Check::Text),
    spec("html", &[AnyTrack], Check::Text),
    spec("boxedCfg", &[AnyTrack], Check::OneOf(ON_OFF)),
    spec("chromosomes", &[AnyTrack], Check::Text),
    spec("darkerLabels", &[AnyTrack], Check::OneOf(ON)),
    spec("dataVersion", &[AnyTrack], Check::Text),
    spec("directUrl", &[AnyTrack], Check::Text),
    spec("url", &[AnyTrack], Check::Text),
    spec("urlLabel", &[AnyTrack], Check::Text),
    spec("urls", &[AnyTrack], Check::KeyVal),
    spec("otherDb", &[AnyTrack], Check::Text),
    spec("pennantIcon", &[AnyTrack], Check::Text),
    spec("mouseOverField", &[AnyTrack], Check::Text),
    spec("skipEmptyFields", &[AnyTrack], Check::OneOf(ON)),
    spec("maxWindowToDraw", &[AnyTrack], Check::Int),
    spec("bigDataIndex", &[TrackType("bam"), TrackType("vcfTabix")], Check::Text),
    // bam
    spec("refUrl", &[TrackType("bam")], Check::Text),
    spec("bamColorMode", &[TrackType("bam")], Check::OneOf(&["strand", "gray", "tag", "off"])),
    spec("bamGrayMode", &[TrackType("bam")], Check::OneOf(&["aliQual", "baseQual", "unpaired"])),
    spec("aliQualRange", &[TrackType("bam")], Check::Pair),
    spec("baseQualRange", &[TrackType("bam")], Check::Pair),
    spec("bamColorTag", &[TrackType("bam")], Check::Text),
    spec("noColorTag", &[TrackType("bam")], Check::OneOf(&["."])),
    spec("bamSkipPrintQualScore", &[TrackType("bam")], Check::OneOf(&["."])),
    spec("indelDoubleInsert", &[TrackType("bam")], Check::OneOf(ON_OFF)),
    spec("indelQueryInsert", &[TrackType("bam")], Check::OneOf(ON_OFF)),
    spec("indelPolyA", &[TrackType("bam")], Check::OneOf(ON_OFF)),
    spec("minAliQual", &[TrackType("bam")], Check::Int),
    spec("pairEndsByName", &[TrackType("bam")], Check::OneOf(&["."])),
    spec("pairSearchRange", &[TrackType("bam")], Check::Int),
    spec("showNames", &[TrackType("bam")], Check::OneOf(ON_OFF)),
    // bigWig and friends
    spec(
        "autoScale",
        &[TrackType("bigWig"), TrackType("hic"), Composite],
        Check::OneOf(&["on", "off", "group"]),
    ),
    spec("alwaysZero", &[TrackType("bigWig")], Check::OneOf(ON_OFF)),
    spec("graphTypeDefault", &[TrackType("bigWig")], Check::OneOf(&["bar", "points"])),
    spec(
        "maxHeightPixels",
        &[TrackType("bigWig"), TrackType("bigInteract"), TrackType("hic")],
        Check::Triple,
    ),
    spec("maxWindowToQuery", &[TrackType("bigWig")], Check::Int),
    spec("negateValues", &[TrackType("bigWig")], Check::OneOf(ON_OFF)),
    spec("smoothingWindow", &[TrackType("bigWig")], Check::OffOrInt),
    spec("transformFunc", &[TrackType("bigWig")], Check::OneOf(&["NONE", "LOG"])),
    spec("viewLimits", &[TrackType("bigWig")], Check::Pair),
    spec("viewLimitsMax", &[TrackType("bigWig")], Check::Pair),
    spec(
        "windowingFunction",
        &[TrackType("bigWig")],
        Check::OneOf(&["maximum", "mean", "minimum", "mean+whiskers"]),
    ),
    spec("yLineMark", &[TrackType("bigWig")], Check::Float),
    spec("yLineOnOff", &[TrackType("bigWig")], Check::OneOf(ON_OFF)),
    spec("gridDefault", &[TrackType("bigWig")], Check::OneOf(ON)),
    // bigBed and friends
    spec("itemRgb", &[TrackType("bigBed")], Check::OneOf(ON)),
    spec("colorByStrand", &[TrackType("bigBed")], Check::RgbPair),
    spec("denseCoverage", &[TrackType("bigBed")], Check::Int),
    spec("labelOnFeature", &[TrackType("bigBed")], Check::OneOf(ON_OFF)),
    spec("exonArrows", &[TrackType("bigBed")], Check::OneOf(ON_OFF)),
    spec("exonNumbers", &[TrackType("bigBed")], Check::OneOf(ON_OFF)),
    spec("scoreFilter", &[TrackType("bigBed")], Check::RangeOrNumber),
    spec("scoreFilterLimits", &[TrackType("bigBed")], Check::Pair),
    spec("maxItems", &[TrackType("bigBed")], Check::Int),
    spec(
        "minGrayLevel",
        &[TrackType("bigBed")],
        Check::OneOf(&["1", "2", "3", "4", "5", "6", "7", "8", "9"]),
    ),
    spec("noScoreFilter", &[TrackType("bigBed")], Check::OneOf(ON)),
    spec("spectrum", &[TrackType("bigBed")], Check::OneOf(ON)),
    spec("scoreMax", &[TrackType("bigBed")], Check::Int),
    spec("scoreMin", &[TrackType("bigBed")], Check::Int),
    spec("thickDrawItem", &[TrackType("bigBed")], Check::OneOf(ON_OFF)),
    spec("searchIndex", &[TrackType("bigBed")], Check::Text),
    spec("searchTrix", &[TrackType("bigBed")], Check::Text),
    spec("labelFields", &[TrackType("bigBed")], Check::Text),
    spec("defaultLabelFields", &[TrackType("bigBed")], Check::Text),
    spec("bedNameLabel", &[TrackType("bigBed")], Check::Text),
    // bigBarChart
    spec("barChartBars", &[TrackType("bigBarChart")], Check::Text),
    spec("barChartColors", &[TrackType("bigBarChart")], Check::Text),
    spec("barChartLabel", &[TrackType("bigBarChart")], Check::Text),
    spec("barChartMetric", &[TrackType("bigBarChart")], Check::Text),
    spec("barChartUnit", &[TrackType("bigBarChart")], Check::Text),
    spec("barChartMatrixUrl", &[TrackType("bigBarChart")], Check::Text),
    spec("barChartSampleUrl", &[TrackType("bigBarChart")], Check::Text),
    spec("maxLimit", &[TrackType("bigBarChart")], Check::Float),
    // bigInteract
    spec(
        "interactDirectional",
        &[TrackType("bigInteract")],
        Check::OneOf(&["on", "off", "offsetSource", "offsetTarget"]),
    ),
    spec("interactUp", &[TrackType("bigInteract")], Check::OneOf(TRUE_FALSE)),
    spec("interactMultiRegion", &[TrackType("bigInteract")], Check::OneOf(ON_OFF)),
    // vcfTabix
    spec("applyMinQual", &[TrackType("vcfTabix")], Check::OneOf(TRUE_FALSE)),
    spec("minQual", &[TrackType("vcfTabix")], Check::Int),
    spec("minFreq", &[TrackType("vcfTabix")], Check::Float),
    spec("hapClusterEnabled", &[TrackType("vcfTabix")], Check::OneOf(TRUE_FALSE)),
    spec(
        "hapClusterColorBy",
        &[TrackType("vcfTabix")],
        Check::OneOf(&["altOnly", "refAlt", "base"]),
    ),
    spec(
        "hapClusterTreeAngle",
        &[TrackType("vcfTabix")],
        Check::OneOf(&["triangle", "rectangle"]),
    ),
    spec("hapClusterHeight", &[TrackType("vcfTabix")], Check::Int),
    spec("showHardyWeinberg", &[TrackType("vcfTabix")], Check::OneOf(ON)),
    // hic
    spec("drawMode", &[TrackType("hic")], Check::OneOf(&["square", "triangle", "arc"])),
    spec(
        "normalization",
        &[TrackType("hic")],
        Check::OneOf(&["NONE", "VC", "VC_SQRT", "KR"]),
    ),
    spec("resolution", &[TrackType("hic")], Check::Text),
    // Composite tracks
    spec("allButtonPair", &[Composite], Check::OneOf(ON)),
    spec("centerLabelsDense", &[Composite], Check::OneOf(ON_OFF)),
    spec("dragAndDrop", &[Composite], Check::OneOf(&["subTracks"])),
    spec("hideEmptySubtracks", &[Composite], Check::OneOf(ON_OFF)),
    spec("dimensions", &[Composite], Check::KeyVal),
    spec("filterComposite", &[Composite], Check::Text),
    spec("sortOrder", &[Composite], Check::KeyVal),
    spec("dimensionAchecked", &[Composite], Check::Text),
    spec("dimensionBchecked", &[Composite], Check::Text),
    // View tracks
    spec("viewUi", &[View], Check::OneOf(ON)),
    // Aggregate tracks
    spec("showSubtrackColorOnUi", &[Aggregate], Check::OneOf(ON)),
    // Genome stanzas
    spec("defaultPos", &[Genome], Check::Position),
    spec("description", &[Genome], Check::Text),
    spec("organism", &[Genome], Check::Text),
    spec("scientificName", &[Genome], Check::Text),
    spec("orderKey", &[Genome], Check::Int),
    spec("blat", &[Assembly], Check::Text),
    spec("transBlat", &[Assembly], Check::Text),
    spec("isPcr", &[Assembly], Check::Text),
    spec("chromSizes", &[Assembly], Check::Text),
    // Hub stanza
    spec("email", &[Hub], Check::Text),
    spec("descriptionUrl", &[Hub], Check::Text),
];

/// Find the table row for a parameter name
pub fn lookup(key: &str) -> Option<&'static ParamSpec> {
    RECOGNIZED.iter().find(|spec| spec.name == key)
}

/// First word of a `type` value, e.g. `bigBed` for `bigBed 6+3`
pub fn base_type(track_type: &str) -> &str {
    track_type.split_whitespace().next().unwrap_or("")
}

impl ParamSpec {
    /// Whether this parameter is valid on a node of `kind` whose `type`
    /// parameter is `track_type`.
    pub fn applies_to(&self, kind: NodeKind, track_type: Option<&str>, assembly: bool) -> bool {
        let base = track_type.map(base_type);
        self.scopes.iter().any(|scope| match scope {
            AnyTrack => kind.is_track(),
            TrackType(family) => {
                kind.is_track()
                    && base.is_some_and(|base| {
                        base == *family || (*family == "bigBed" && BED_FAMILY.contains(&base))
                    })
            }
            Composite => kind == NodeKind::CompositeTrack,
            View => kind == NodeKind::ViewTrack,
            Aggregate => kind == NodeKind::AggregateTrack,
            Genome => kind == NodeKind::Genome,
            Assembly => kind == NodeKind::Genome && assembly,
            Hub => kind == NodeKind::Hub,
        })
    }
}

static KEY_VAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s=]+=[^\s=]+(\s+[^\s=]+=[^\s=]+)*$").expect("valid regex"));

static POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\s:]+):([0-9]+)-([0-9]+)$").expect("valid regex"));

/// Check a value against the recognized format for `key`.
///
/// Unrecognized keys pass; the validator decides whether they are allowed.
///
/// # Returns
///
/// * `Ok(())` if the key is unrecognized or the value is well formed
/// * `Err(HubError::Parameter)` describing the malformed value
pub fn check_value(key: &str, value: &str) -> Result<(), HubError> {
    match lookup(key) {
        Some(spec) => spec
            .check
            .run(value)
            .map_err(|reason| HubError::Parameter(format!("{}: {}", key, reason))),
        None => Ok(()),
    }
}

impl Check {
    /// Run the check, returning a human-readable reason on failure
    pub fn run(&self, value: &str) -> Result<(), String> {
        match self {
            Check::Text => {
                if value.is_empty() {
                    Err("value cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }
            Check::OneOf(allowed) => {
                if allowed.contains(&value) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of {}", value, allowed.join("/")))
                }
            }
            Check::Rgb => check_rgb(value),
            Check::RgbPair => {
                let parts: Vec<&str> = value.split(' ').collect();
                if parts.len() != 2 {
                    return Err(format!("'{}' is not two space-separated RGB triples", value));
                }
                parts.iter().try_for_each(|part| check_rgb(part))
            }
            Check::Int => value
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("'{}' is not an integer", value)),
            Check::Float => value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("'{}' is not a number", value)),
            Check::Pair => check_numbers(value, &[2]),
            Check::Triple => check_numbers(value, &[3]),
            Check::RangeOrNumber => check_numbers(value, &[1, 2]),
            Check::Position => {
                let caps = POSITION
                    .captures(value)
                    .ok_or_else(|| format!("'{}' is not a chrom:start-end position", value))?;
                let start: u64 = caps[2].parse().map_err(|_| "start is not a number".to_string())?;
                let end: u64 = caps[3].parse().map_err(|_| "end is not a number".to_string())?;
                if start >= end {
                    return Err(format!("start {} must be less than end {}", start, end));
                }
                Ok(())
            }
            Check::OffOrInt => {
                if value == "off" || value.parse::<i64>().is_ok() {
                    Ok(())
                } else {
                    Err(format!("'{}' is neither 'off' nor an integer", value))
                }
            }
            Check::KeyVal => {
                if KEY_VAL.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not a list of key=value items", value))
                }
            }
            Check::TrackType => {
                if TRACK_TYPES.contains(&base_type(value)) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not a known track type", value))
                }
            }
        }
    }
}

fn check_rgb(value: &str) -> Result<(), String> {
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("'{}' is not an r,g,b triple", value));
    }
    for part in parts {
        part.parse::<u8>()
            .map_err(|_| format!("'{}' has a component outside 0-255", value))?;
    }
    Ok(())
}

fn check_numbers(value: &str, counts: &[usize]) -> Result<(), String> {
    let parts: Vec<&str> = value.split(':').collect();
    if !counts.contains(&parts.len()) {
        return Err(format!("'{}' does not have {:?} colon-separated parts", value, counts));
    }
    for part in parts {
        part.parse::<f64>()
            .map_err(|_| format!("'{}' in '{}' is not a number", part, value))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, &str)]) -> ParameterStore {
        let mut store = ParameterStore::new();
        for (key, value) in pairs {
            store.set(*key, *value).unwrap();
        }
        store
    }

    #[test]
    fn test_set_preserves_first_insertion_order() {
        let mut store = ParameterStore::new();
        store.set("visibility", "full").unwrap();
        store.set("color", "128,0,0").unwrap();
        store.set("visibility", "dense").unwrap();

        let keys: Vec<&str> = store.keys().collect();
        assert_eq!(keys, vec!["visibility", "color"]);
        assert_eq!(store.get("visibility"), Some("dense"));
    }

    #[test]
    fn test_set_rejects_bad_keys() {
        let mut store = ParameterStore::new();
        assert!(store.set("", "x").is_err());
        assert!(store.set("two words", "x").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_values_are_whitespace_sanitized() {
        let mut store = ParameterStore::new();
        store.set("longLabel", "  a long\n label\twith  gaps ").unwrap();
        assert_eq!(store.get("longLabel"), Some("a long label with gaps"));
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let mut store = ParameterStore::new();
        store.set("color", "0,0,0").unwrap();
        assert_eq!(store.remove("visibility"), None);
        assert_eq!(store.remove("color"), Some("0,0,0".to_string()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_merge_later_wins() {
        let mut left = store(&[("color", "0,0,0"), ("visibility", "full")]);
        let right = store(&[("visibility", "dense"), ("priority", "2")]);

        left.merge(&right);
        let entries: Vec<(&str, &str)> = left.iter().collect();
        assert_eq!(
            entries,
            vec![("color", "0,0,0"), ("visibility", "dense"), ("priority", "2")]
        );
    }

    #[test]
    fn test_ordered_promotes_canonical_keys() {
        let params = store(&[("type", "bigWig"), ("color", "1,2,3"), ("shortLabel", "s")]);
        let ordered = params.ordered(&["shortLabel", "longLabel", "type"]);
        assert_eq!(
            ordered,
            vec![("shortLabel", "s"), ("type", "bigWig"), ("color", "1,2,3")]
        );
    }

    #[test]
    fn test_check_value() {
        assert!(check_value("color", "128,0,255").is_ok());
        assert!(check_value("color", "128,0,256").is_err());
        assert!(check_value("color", "128, 0, 0").is_err());
        assert!(check_value("visibility", "full").is_ok());
        assert!(check_value("visibility", "loud").is_err());
        assert!(check_value("viewLimits", "-2:2").is_ok());
        assert!(check_value("maxHeightPixels", "8:80:128").is_ok());
        assert!(check_value("maxHeightPixels", "8:80").is_err());
        assert!(check_value("defaultPos", "chr21:33031596-33033258").is_ok());
        assert!(check_value("defaultPos", "chr21:500-100").is_err());
        assert!(check_value("smoothingWindow", "off").is_ok());
        assert!(check_value("smoothingWindow", "4").is_ok());
        assert!(check_value("sortOrder", "cell=+ factor=-").is_ok());
        assert!(check_value("sortOrder", "cell").is_err());
        assert!(check_value("type", "bigBed 6+3").is_ok());
        assert!(check_value("type", "wiggle_0").is_err());
        assert!(check_value("someCustomKey", "anything").is_ok());
    }

    #[test]
    fn test_applies_to_track_families() {
        let items = lookup("itemRgb").unwrap();
        assert!(items.applies_to(NodeKind::Track, Some("bigNarrowPeak"), false));
        assert!(!items.applies_to(NodeKind::Track, Some("bigWig"), false));

        let auto_scale = lookup("autoScale").unwrap();
        assert!(auto_scale.applies_to(NodeKind::CompositeTrack, None, false));
        assert!(auto_scale.applies_to(NodeKind::ViewTrack, Some("bigWig"), false));

        let blat = lookup("blat").unwrap();
        assert!(blat.applies_to(NodeKind::Genome, None, true));
        assert!(!blat.applies_to(NodeKind::Genome, None, false));
    }
}
