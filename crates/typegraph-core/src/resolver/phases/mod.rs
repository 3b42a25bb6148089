//! Resolution phases.
//!
//! A load proceeds in two strictly separated stages:
//!
//! 1. **Read**: atoms, then links, then concepts are decoded, qualified and
//!    registered; implicit types are synthesized here, so the definition set
//!    reaches its fixpoint before anything is ordered.
//! 2. **Order**: per category, a dependency/merge graph is built over the
//!    whole schema, topologically ordered, and every definition is merged
//!    with its structural parents. Atoms order first, then links, then
//!    concepts, whose merge consumes the fully merged links.

pub mod atoms;
pub mod concepts;
pub mod links;
pub mod synth;

pub use atoms::{order_atoms, read_atoms};
pub use concepts::{order_concepts, read_concepts};
pub use links::{order_links, read_links};
pub use synth::{derived_link_name, inline_atom_name, synthesize_inline_atom};
