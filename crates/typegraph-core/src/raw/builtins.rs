//! Synthetic builtin module.
//!
//! Rather than hard-coding builtin recognition throughout the resolver, the
//! canonical roots and base atoms are generated as an ordinary record set and
//! fed through the normal read pipeline before any user module. Later passes
//! then observe them like any other definition.

use super::{ModuleRecords, RawValue};
use crate::model::QualName;
use alloc::collections::BTreeMap;
use alloc::string::String;

/// Name of the builtin module.
pub const BUILTIN_MODULE: &str = "std";

/// Local name of the canonical root concept.
pub const ROOT_CONCEPT: &str = "Object";

/// Local name of the canonical root link.
pub const ROOT_LINK: &str = "link";

/// Base atoms every schema can reference without imports.
pub const BUILTIN_ATOMS: &[&str] = &["bool", "bytes", "datetime", "float", "int", "str"];

/// The qualified name of the canonical root concept (`std.Object`).
#[must_use]
pub fn root_concept_name() -> QualName {
    QualName::new(BUILTIN_MODULE, ROOT_CONCEPT)
}

/// The qualified name of the canonical root link (`std.link`).
#[must_use]
pub fn root_link_name() -> QualName {
    QualName::new(BUILTIN_MODULE, ROOT_LINK)
}

/// Check whether a qualified name belongs to the builtin module.
#[must_use]
pub fn is_builtin(name: &QualName) -> bool {
    name.module() == BUILTIN_MODULE
}

/// Build the builtin module's record set.
#[must_use]
pub fn builtin_records() -> ModuleRecords {
    let mut records = ModuleRecords::new(BUILTIN_MODULE);

    for atom in BUILTIN_ATOMS {
        records
            .atoms
            .insert(String::from(*atom), RawValue::Map(BTreeMap::new()));
    }

    // The root link is abstract and carries the permissive defaults every
    // unannotated link inherits.
    let mut root_link = BTreeMap::new();
    root_link.insert(String::from("abstract"), RawValue::Bool(true));
    root_link.insert(String::from("mapping"), RawValue::Str(String::from("**")));
    root_link.insert(String::from("required"), RawValue::Bool(false));
    records
        .links
        .insert(String::from(ROOT_LINK), RawValue::Map(root_link));

    let mut root_concept = BTreeMap::new();
    root_concept.insert(String::from("abstract"), RawValue::Bool(true));
    records
        .concepts
        .insert(String::from(ROOT_CONCEPT), RawValue::Map(root_concept));

    records
}
