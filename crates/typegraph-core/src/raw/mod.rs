//! Raw schema records.
//!
//! The resolver consumes definitions that have already been parsed into
//! nested key/value records by an external collaborator (the source format is
//! out of scope here). This module defines that input surface and the typed
//! declarations the readers decode it into.
//!
//! # Record shapes
//!
//! Atom records:
//!
//! ```text
//! { extends?, default?, title?, description?, abstract?, mods? }
//! ```
//!
//! Link records:
//!
//! ```text
//! { extends?, title?, description?, abstract?, mapping?, required?,
//!   properties?: { name: <atom-ref> | { atom, default?, title?, description?, mods? } } }
//! ```
//!
//! Concept records:
//!
//! ```text
//! { extends?, title?, description?, abstract?,
//!   links?: { name: <target> | [<target>, ..]
//!             | { <target>: { mapping?, required?, default?, title?, description?, mods? } } } }
//! ```
//!
//! Modifier lists hold single-key maps: `{expr}`, `{min-length}`,
//! `{max-length}` or `{regexp}`.

pub mod builtins;

use crate::error::SchemaError;
use crate::model::{AtomMod, Mapping};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// A semi-structured value inside a raw record.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RawValue {
    /// UTF-8 string.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Ordered list of values.
    List(Vec<RawValue>),
    /// String-keyed mapping.
    Map(BTreeMap<String, RawValue>),
    /// Explicit absence.
    Null,
}

impl RawValue {
    /// Get the string payload, if this value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean payload, if this value is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get a non-negative integer payload.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }

    /// Get the list payload, if this value is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[RawValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the map payload, if this value is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, RawValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Check for explicit absence.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One module's worth of raw schema records.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModuleRecords {
    /// The module these records belong to.
    pub module: String,
    /// Import alias table: `alias -> module name`.
    pub aliases: BTreeMap<String, String>,
    /// Module-level default backend tag applied to atoms and concepts.
    pub backend: Option<String>,
    /// Atom records keyed by short name.
    pub atoms: BTreeMap<String, RawValue>,
    /// Link records keyed by short name.
    pub links: BTreeMap<String, RawValue>,
    /// Concept records keyed by short name.
    pub concepts: BTreeMap<String, RawValue>,
}

impl ModuleRecords {
    /// Create an empty record set for a module.
    #[must_use]
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            ..Self::default()
        }
    }
}

fn bad(name: &str, detail: &str) -> SchemaError {
    SchemaError::InvalidDeclaration {
        name: name.to_string(),
        detail: detail.to_string(),
    }
}

fn field_str(name: &str, map: &BTreeMap<String, RawValue>, key: &str) -> Result<Option<String>, SchemaError> {
    match map.get(key) {
        None => Ok(None),
        Some(RawValue::Null) => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| bad(name, &alloc::format!("`{key}` must be a string"))),
    }
}

fn field_bool(name: &str, map: &BTreeMap<String, RawValue>, key: &str) -> Result<Option<bool>, SchemaError> {
    match map.get(key) {
        None => Ok(None),
        Some(RawValue::Null) => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| bad(name, &alloc::format!("`{key}` must be a boolean"))),
    }
}

/// Decode an `extends` field that may be a single name or a list of names.
fn field_name_list(name: &str, map: &BTreeMap<String, RawValue>, key: &str) -> Result<Vec<String>, SchemaError> {
    match map.get(key) {
        None | Some(RawValue::Null) => Ok(Vec::new()),
        Some(RawValue::Str(s)) => Ok(alloc::vec![s.clone()]),
        Some(RawValue::List(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(ToString::to_string)
                    .ok_or_else(|| bad(name, &alloc::format!("`{key}` entries must be strings")))
            })
            .collect(),
        Some(_) => Err(bad(name, &alloc::format!("`{key}` must be a name or list of names"))),
    }
}

/// Decode a modifier list.
pub(crate) fn decode_mods(name: &str, value: &RawValue) -> Result<Vec<AtomMod>, SchemaError> {
    let items = value
        .as_list()
        .ok_or_else(|| bad(name, "`mods` must be a list"))?;

    let mut mods = Vec::with_capacity(items.len());
    for item in items {
        let map = item
            .as_map()
            .ok_or_else(|| bad(name, "each modifier must be a single-key map"))?;
        let (key, payload) = match map.iter().next() {
            Some(entry) if map.len() == 1 => entry,
            _ => return Err(bad(name, "each modifier must be a single-key map")),
        };
        let decoded = match key.as_str() {
            "expr" => payload.as_str().map(|s| AtomMod::Expr(s.to_string())),
            "min-length" => payload.as_u64().map(AtomMod::MinLength),
            "max-length" => payload.as_u64().map(AtomMod::MaxLength),
            "regexp" => payload.as_str().map(|s| AtomMod::Pattern(s.to_string())),
            other => return Err(bad(name, &alloc::format!("unknown modifier `{other}`"))),
        };
        match decoded {
            Some(m) => mods.push(m),
            None => return Err(bad(name, &alloc::format!("invalid payload for modifier `{key}`"))),
        }
    }
    Ok(mods)
}

fn field_mods(name: &str, map: &BTreeMap<String, RawValue>) -> Result<Vec<AtomMod>, SchemaError> {
    match map.get("mods") {
        None | Some(RawValue::Null) => Ok(Vec::new()),
        Some(value) => decode_mods(name, value),
    }
}

fn field_mapping(name: &str, map: &BTreeMap<String, RawValue>) -> Result<Option<Mapping>, SchemaError> {
    match map.get("mapping") {
        None | Some(RawValue::Null) => Ok(None),
        Some(value) => {
            let code = value
                .as_str()
                .ok_or_else(|| bad(name, "`mapping` must be a string code"))?;
            Mapping::from_code(code)
                .map(Some)
                .ok_or_else(|| bad(name, &alloc::format!("unknown mapping code `{code}`")))
        }
    }
}

/// A decoded atom declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct RawAtom {
    /// Base atom reference, as written.
    pub extends: Option<String>,
    /// Default value.
    pub default: Option<RawValue>,
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Abstract flag.
    pub is_abstract: bool,
    /// Inline modifiers.
    pub mods: Vec<AtomMod>,
}

impl RawAtom {
    /// Decode an atom record.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDeclaration`] when the record does not
    /// have the documented shape.
    pub fn from_value(name: &str, value: &RawValue) -> Result<Self, SchemaError> {
        let map = value
            .as_map()
            .ok_or_else(|| bad(name, "atom record must be a map"))?;
        Ok(Self {
            extends: field_str(name, map, "extends")?,
            default: map.get("default").filter(|v| !v.is_null()).cloned(),
            title: field_str(name, map, "title")?,
            description: field_str(name, map, "description")?,
            is_abstract: field_bool(name, map, "abstract")?.unwrap_or(false),
            mods: field_mods(name, map)?,
        })
    }
}

/// A decoded link property declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct RawLinkProperty {
    /// Atom type reference, as written.
    pub atom: String,
    /// Default value.
    pub default: Option<RawValue>,
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Inline modifiers; trigger automatic atom synthesis.
    pub mods: Vec<AtomMod>,
}

impl RawLinkProperty {
    /// Decode a property record: either a bare atom reference or a map.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDeclaration`] on shape mismatch.
    pub fn from_value(name: &str, value: &RawValue) -> Result<Self, SchemaError> {
        match value {
            RawValue::Str(atom) => Ok(Self {
                atom: atom.clone(),
                default: None,
                title: None,
                description: None,
                mods: Vec::new(),
            }),
            RawValue::Map(map) => {
                let atom = field_str(name, map, "atom")?
                    .ok_or_else(|| bad(name, "property record needs an `atom` reference"))?;
                Ok(Self {
                    atom,
                    default: map.get("default").filter(|v| !v.is_null()).cloned(),
                    title: field_str(name, map, "title")?,
                    description: field_str(name, map, "description")?,
                    mods: field_mods(name, map)?,
                })
            }
            _ => Err(bad(name, "property must be an atom reference or a map")),
        }
    }
}

/// A decoded link declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct RawLink {
    /// Base link references, as written.
    pub extends: Vec<String>,
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Abstract flag.
    pub is_abstract: bool,
    /// Mapping cardinality.
    pub mapping: Option<Mapping>,
    /// Required flag.
    pub required: Option<bool>,
    /// Properties keyed by short name.
    pub properties: BTreeMap<String, RawLinkProperty>,
}

impl RawLink {
    /// Decode a link record.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDeclaration`] on shape mismatch.
    pub fn from_value(name: &str, value: &RawValue) -> Result<Self, SchemaError> {
        let map = value
            .as_map()
            .ok_or_else(|| bad(name, "link record must be a map"))?;

        let mut properties = BTreeMap::new();
        if let Some(props) = map.get("properties").filter(|v| !v.is_null()) {
            let props = props
                .as_map()
                .ok_or_else(|| bad(name, "`properties` must be a map"))?;
            for (prop_name, prop_value) in props {
                properties.insert(prop_name.clone(), RawLinkProperty::from_value(name, prop_value)?);
            }
        }

        Ok(Self {
            extends: field_name_list(name, map, "extends")?,
            title: field_str(name, map, "title")?,
            description: field_str(name, map, "description")?,
            is_abstract: field_bool(name, map, "abstract")?.unwrap_or(false),
            mapping: field_mapping(name, map)?,
            required: field_bool(name, map, "required")?,
            properties,
        })
    }
}

/// One own-link declaration on a concept.
#[derive(Clone, Debug, PartialEq)]
pub struct RawConceptLink {
    /// Target type reference, as written.
    pub target: String,
    /// Mapping cardinality.
    pub mapping: Option<Mapping>,
    /// Required flag.
    pub required: Option<bool>,
    /// Default value.
    pub default: Option<RawValue>,
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Inline modifiers; trigger automatic atom synthesis for atom targets.
    pub mods: Vec<AtomMod>,
}

impl RawConceptLink {
    fn bare(target: &str) -> Self {
        Self {
            target: target.to_string(),
            mapping: None,
            required: None,
            default: None,
            title: None,
            description: None,
            mods: Vec::new(),
        }
    }

    /// Decode one link-name entry into its list of target declarations.
    ///
    /// A bare string is a single target, a list fans out to several targets,
    /// and a map carries per-target attributes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDeclaration`] on shape mismatch.
    pub fn from_value(name: &str, value: &RawValue) -> Result<Vec<Self>, SchemaError> {
        match value {
            RawValue::Str(target) => Ok(alloc::vec![Self::bare(target)]),
            RawValue::List(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(Self::bare)
                        .ok_or_else(|| bad(name, "link target lists must contain names"))
                })
                .collect(),
            RawValue::Map(targets) => {
                let mut decls = Vec::with_capacity(targets.len());
                for (target, info) in targets {
                    let info = info
                        .as_map()
                        .ok_or_else(|| bad(name, "link target attributes must be a map"))?;
                    decls.push(Self {
                        target: target.clone(),
                        mapping: field_mapping(name, info)?,
                        required: field_bool(name, info, "required")?,
                        default: info.get("default").filter(|v| !v.is_null()).cloned(),
                        title: field_str(name, info, "title")?,
                        description: field_str(name, info, "description")?,
                        mods: field_mods(name, info)?,
                    });
                }
                Ok(decls)
            }
            _ => Err(bad(name, "link declaration must be a target, list or map")),
        }
    }
}

/// A decoded concept declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct RawConcept {
    /// Base references, schema and host alike, as written.
    pub extends: Vec<String>,
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Abstract flag.
    pub is_abstract: bool,
    /// Own-link declarations keyed by link name as written.
    pub links: BTreeMap<String, Vec<RawConceptLink>>,
}

impl RawConcept {
    /// Decode a concept record.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDeclaration`] on shape mismatch.
    pub fn from_value(name: &str, value: &RawValue) -> Result<Self, SchemaError> {
        let map = value
            .as_map()
            .ok_or_else(|| bad(name, "concept record must be a map"))?;

        let mut links = BTreeMap::new();
        if let Some(declared) = map.get("links").filter(|v| !v.is_null()) {
            let declared = declared
                .as_map()
                .ok_or_else(|| bad(name, "`links` must be a map"))?;
            for (link_name, link_value) in declared {
                links.insert(link_name.clone(), RawConceptLink::from_value(name, link_value)?);
            }
        }

        Ok(Self {
            extends: field_name_list(name, map, "extends")?,
            title: field_str(name, map, "title")?,
            description: field_str(name, map, "description")?,
            is_abstract: field_bool(name, map, "abstract")?.unwrap_or(false),
            links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn map(entries: &[(&str, RawValue)]) -> RawValue {
        RawValue::Map(
            entries
                .iter()
                .map(|(k, v)| (String::from(*k), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_decode_atom() {
        let record = map(&[
            ("extends", RawValue::Str("str".into())),
            ("abstract", RawValue::Bool(true)),
            (
                "mods",
                RawValue::List(vec![map(&[("max-length", RawValue::Int(10))])]),
            ),
        ]);
        let atom = RawAtom::from_value("str_short", &record).unwrap();
        assert_eq!(atom.extends.as_deref(), Some("str"));
        assert!(atom.is_abstract);
        assert_eq!(atom.mods, vec![AtomMod::MaxLength(10)]);
    }

    #[test]
    fn test_decode_atom_rejects_scalar() {
        let err = RawAtom::from_value("x", &RawValue::Str("oops".into())).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDeclaration { .. }));
    }

    #[test]
    fn test_decode_unknown_mod() {
        let record = map(&[(
            "mods",
            RawValue::List(vec![map(&[("shouting", RawValue::Bool(true))])]),
        )]);
        assert!(RawAtom::from_value("x", &record).is_err());
    }

    #[test]
    fn test_decode_link_with_properties() {
        let record = map(&[
            ("extends", RawValue::Str("related".into())),
            (
                "properties",
                map(&[
                    ("weight", RawValue::Str("float".into())),
                    (
                        "note",
                        map(&[
                            ("atom", RawValue::Str("str".into())),
                            (
                                "mods",
                                RawValue::List(vec![map(&[("max-length", RawValue::Int(80))])]),
                            ),
                        ]),
                    ),
                ]),
            ),
        ]);
        let link = RawLink::from_value("annotated", &record).unwrap();
        assert_eq!(link.extends, vec![String::from("related")]);
        assert_eq!(link.properties["weight"].atom, "float");
        assert_eq!(link.properties["note"].mods.len(), 1);
    }

    #[test]
    fn test_decode_concept_link_forms() {
        // Bare target
        let single = RawConceptLink::from_value("Person", &RawValue::Str("str".into())).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].target, "str");

        // Target list
        let fanned = RawConceptLink::from_value(
            "Person",
            &RawValue::List(vec![
                RawValue::Str("Article".into()),
                RawValue::Str("Comment".into()),
            ]),
        )
        .unwrap();
        assert_eq!(fanned.len(), 2);

        // Attributed target
        let attributed = RawConceptLink::from_value(
            "Person",
            &map(&[(
                "Article",
                map(&[
                    ("mapping", RawValue::Str("1*".into())),
                    ("required", RawValue::Bool(true)),
                ]),
            )]),
        )
        .unwrap();
        assert_eq!(attributed[0].mapping, Some(Mapping::OneToMany));
        assert_eq!(attributed[0].required, Some(true));
    }

    #[test]
    fn test_decode_bad_mapping_code() {
        let record = map(&[("mapping", RawValue::Str("*".into()))]);
        assert!(RawLink::from_value("knows", &record).is_err());
    }
}
