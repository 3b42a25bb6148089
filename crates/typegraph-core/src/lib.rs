//! typegraph-core: Declarative schema type-graph resolver
//!
//! This crate resolves a declarative schema description — scalar types
//! ("atoms"), relation types ("links") and entity types ("concepts") — into a
//! fully linearized, inheritance-merged type graph. It is designed to be
//! `no_std` compatible and IO-free: definitions arrive already parsed into
//! nested key/value records, and the finished index is handed back as plain
//! data.
//!
//! # Pipeline
//!
//! ```text
//! Raw records → Readers → Synthesizer → Order/Merge → FinishedIndex
//! ```
//!
//! Parsing, serialization, caching and storage backends are external
//! collaborators and are not part of this crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod graph;
pub mod host;
pub mod model;
pub mod raw;
pub mod resolver;
