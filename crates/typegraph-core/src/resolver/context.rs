//! Resolution context (working state of one module load).

use super::scope::ModuleScope;
use super::tracing::Tracer;
use crate::host::HostTypeResolver;
use crate::model::Schema;
use alloc::string::String;

/// Working state threaded through the read phases of one module load.
///
/// The schema is the process-scoped global index; the scope is the load-local
/// name table. Keeping them as two explicit values is what lets a nested
/// module load resolve its own short names while registering into the shared
/// index.
pub struct ResolverContext<'a> {
    /// The global schema being populated.
    pub schema: &'a mut Schema,
    /// The current module's name-resolution scope.
    pub scope: ModuleScope,
    /// Host-type namespace for non-schema bases.
    pub host: &'a dyn HostTypeResolver,
    /// Module-level default backend tag.
    pub backend: Option<String>,
    /// Receiver for structured trace events.
    pub tracer: &'a mut dyn Tracer,
}

impl<'a> ResolverContext<'a> {
    /// Create a context for one module load.
    pub fn new(
        schema: &'a mut Schema,
        scope: ModuleScope,
        host: &'a dyn HostTypeResolver,
        backend: Option<String>,
        tracer: &'a mut dyn Tracer,
    ) -> Self {
        Self {
            schema,
            scope,
            host,
            backend,
            tracer,
        }
    }
}
