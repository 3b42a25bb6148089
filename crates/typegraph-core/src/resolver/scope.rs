//! Module scope and name normalization (the name table).
//!
//! Every load resolves short and aliased names against one [`ModuleScope`]:
//! the current module, the alias table built from its imports, the implicit
//! builtin module and, when permitted, the host-type namespace.
//!
//! Precedence: a definition in the current module always wins; next the
//! imported modules and the host namespace are searched together (a short
//! name matching more than one of them is ambiguous); the builtin module is
//! the fallback.

use crate::error::SchemaError;
use crate::host::HostTypeResolver;
use crate::model::{Category, QualName, Schema};
use crate::raw::builtins::BUILTIN_MODULE;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// The name-resolution scope of one module load.
#[derive(Clone, Debug)]
pub struct ModuleScope {
    module: String,
    /// `alias -> module name`, from the module's imports.
    aliases: BTreeMap<String, String>,
    /// Names declared by this load, for local duplicate detection.
    local: BTreeMap<QualName, Category>,
}

impl ModuleScope {
    /// Create a scope for a module with its import alias table.
    #[must_use]
    pub fn new(module: &str, aliases: BTreeMap<String, String>) -> Self {
        Self {
            module: module.to_string(),
            aliases,
            local: BTreeMap::new(),
        }
    }

    /// The current module name.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Qualify a short name with the current module.
    #[must_use]
    pub fn qualify(&self, short: &str) -> QualName {
        QualName::new(&self.module, short)
    }

    /// Record a name declared by this load.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::DuplicateDefinition`] when the load already
    /// declared the name, in any category.
    pub fn register_local(&mut self, name: QualName, category: Category) -> Result<(), SchemaError> {
        if self.local.contains_key(&name) {
            return Err(SchemaError::DuplicateDefinition { name, category });
        }
        self.local.insert(name, category);
        Ok(())
    }

    /// Resolve a short or qualified reference to a qualified name.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::UnknownModule`] when a qualified reference names a
    ///   module never registered for this scope.
    /// - [`SchemaError::AmbiguousReference`] when a short name matches more
    ///   than one imported/host namespace.
    /// - [`SchemaError::UnresolvedName`] when nothing matches.
    pub fn normalize(
        &self,
        schema: &Schema,
        host: &dyn HostTypeResolver,
        reference: &str,
        allow_host_types: bool,
    ) -> Result<QualName, SchemaError> {
        match self.normalize_or_default(schema, host, reference, allow_host_types)? {
            Some(name) => Ok(name),
            None => Err(SchemaError::UnresolvedName {
                name: reference.to_string(),
                module: self.module.clone(),
            }),
        }
    }

    /// Like [`normalize`](Self::normalize), but an unresolvable short name
    /// yields `Ok(None)` instead of an error, for callers with a default.
    ///
    /// # Errors
    ///
    /// Unknown modules and ambiguous references still fail.
    pub fn normalize_or_default(
        &self,
        schema: &Schema,
        host: &dyn HostTypeResolver,
        reference: &str,
        allow_host_types: bool,
    ) -> Result<Option<QualName>, SchemaError> {
        if let Some(written) = QualName::parse(reference) {
            // Rewrite an alias prefix to its module name.
            let module = self
                .aliases
                .get(written.module())
                .cloned()
                .unwrap_or_else(|| written.module().to_string());
            let resolved = QualName::new(&module, written.local());

            let known = module == self.module
                || module == BUILTIN_MODULE
                || self.aliases.values().any(|m| *m == module)
                || schema.has_module(&module)
                || (allow_host_types && host.owns_module(&module));
            if !known {
                return Err(SchemaError::UnknownModule {
                    module,
                    name: reference.to_string(),
                });
            }
            return Ok(Some(resolved));
        }

        // Tier 1: the current module shadows everything else.
        let own = self.qualify(reference);
        if schema.get(&own).is_some() {
            return Ok(Some(own));
        }

        // Tier 2: imported modules and the host namespace together.
        let mut candidates: BTreeSet<QualName> = BTreeSet::new();
        for module in self.aliases.values() {
            let candidate = QualName::new(module, reference);
            if schema.get(&candidate).is_some() {
                candidates.insert(candidate);
            }
        }
        if allow_host_types {
            for candidate in host.lookup_short(reference) {
                candidates.insert(candidate);
            }
        }
        match candidates.len() {
            1 => {
                return Ok(candidates.into_iter().next());
            }
            0 => {}
            _ => {
                return Err(SchemaError::AmbiguousReference {
                    name: reference.to_string(),
                    candidates: candidates.into_iter().collect::<Vec<_>>(),
                });
            }
        }

        // Tier 3: the builtin module.
        let builtin = QualName::new(BUILTIN_MODULE, reference);
        if schema.get(&builtin).is_some() {
            return Ok(Some(builtin));
        }

        Ok(None)
    }
}
