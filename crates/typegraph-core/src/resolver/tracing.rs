//! Resolver tracing support.
//!
//! Provides structured trace events for debugging resolution issues. The core
//! never logs on its own; a collaborator that wants diagnostics implements
//! [`Tracer`] and passes it to the traced entry points.

use crate::model::Category;

/// Trace verbosity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    /// Critical errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages (phase boundaries, summary stats).
    Info,
    /// Detailed debugging (individual registrations, merges).
    Debug,
    /// Verbose tracing (every operation).
    Trace,
}

/// Resolution phase identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Reading atom records.
    ReadAtoms,
    /// Reading link records.
    ReadLinks,
    /// Reading concept records.
    ReadConcepts,
    /// Ordering and merging atoms.
    OrderAtoms,
    /// Ordering and merging links.
    OrderLinks,
    /// Ordering and merging concepts.
    OrderConcepts,
    /// Building the finished index.
    Consolidate,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Phase::ReadAtoms => write!(f, "read-atoms"),
            Phase::ReadLinks => write!(f, "read-links"),
            Phase::ReadConcepts => write!(f, "read-concepts"),
            Phase::OrderAtoms => write!(f, "order-atoms"),
            Phase::OrderLinks => write!(f, "order-links"),
            Phase::OrderConcepts => write!(f, "order-concepts"),
            Phase::Consolidate => write!(f, "consolidate"),
        }
    }
}

/// Structured trace events emitted during resolution.
#[derive(Clone, Debug)]
pub enum TraceEvent<'a> {
    /// A resolution phase is starting.
    PhaseStart {
        /// The phase.
        phase: Phase,
    },
    /// A resolution phase has ended.
    PhaseEnd {
        /// The phase.
        phase: Phase,
    },
    /// A definition was registered into the schema.
    Registered {
        /// The definition's category.
        category: Category,
        /// The qualified name, rendered.
        name: &'a str,
    },
    /// An automatic atom was synthesized from inline modifiers.
    AtomSynthesized {
        /// The synthesized atom's local name.
        name: &'a str,
        /// The host definition the field belongs to.
        host: &'a str,
        /// The field the modifiers were attached to.
        field: &'a str,
    },
    /// A per-edge implicit link derivative was created.
    LinkDerived {
        /// The derivative's local name.
        name: &'a str,
        /// The source concept.
        source: &'a str,
        /// The target type.
        target: &'a str,
    },
    /// A canonical root base was injected into a definition without bases.
    RootInjected {
        /// The definition's category.
        category: Category,
        /// The definition that received the root base.
        name: &'a str,
    },
    /// A definition was merged with its structural parents.
    Merged {
        /// The definition's category.
        category: Category,
        /// The merged definition.
        name: &'a str,
        /// How many merge parents were combined.
        parents: usize,
    },
    /// Consolidation finished.
    Consolidated {
        /// Entries written into the finished index.
        count: usize,
        /// Builtin entries skipped by the filter.
        skipped_builtin: usize,
    },
}

/// Trait for receiving trace events during resolution.
///
/// The tracer filters events by returning a minimum trace level from
/// `level()`.
pub trait Tracer {
    /// Returns the minimum trace level to emit.
    ///
    /// Events below this level will not be passed to `trace()`.
    /// Default: `TraceLevel::Info`.
    fn level(&self) -> TraceLevel {
        TraceLevel::Info
    }

    /// Called for each trace event at or above the configured level.
    fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>);
}

/// A no-op tracer that discards all events.
#[derive(Default, Clone, Copy, Debug)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn level(&self) -> TraceLevel {
        // Lowest level, so nothing qualifies.
        TraceLevel::Error
    }

    fn trace(&mut self, _level: TraceLevel, _event: TraceEvent<'_>) {
        // Intentionally empty
    }
}

/// Emit a trace event if the tracer level permits.
///
/// Checks the tracer's level before constructing the event, enabling
/// zero-cost tracing when the level is too low.
#[macro_export]
macro_rules! trace_event {
    ($tracer:expr, $level:expr, $event:expr) => {
        if $level <= $tracer.level() {
            $tracer.trace($level, $event);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec::Vec;

    struct TestTracer {
        events: Vec<(TraceLevel, String)>,
        min_level: TraceLevel,
    }

    impl TestTracer {
        fn new(level: TraceLevel) -> Self {
            Self {
                events: Vec::new(),
                min_level: level,
            }
        }
    }

    impl Tracer for TestTracer {
        fn level(&self) -> TraceLevel {
            self.min_level
        }

        fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>) {
            self.events.push((level, format!("{event:?}")));
        }
    }

    #[test]
    fn test_noop_tracer() {
        let mut tracer = NoopTracer;
        tracer.trace(
            TraceLevel::Info,
            TraceEvent::PhaseStart {
                phase: Phase::OrderAtoms,
            },
        );
        // Should not panic
    }

    #[test]
    fn test_trace_level_ordering() {
        assert!(TraceLevel::Error < TraceLevel::Warn);
        assert!(TraceLevel::Warn < TraceLevel::Info);
        assert!(TraceLevel::Info < TraceLevel::Debug);
        assert!(TraceLevel::Debug < TraceLevel::Trace);
    }

    #[test]
    fn test_trace_event_macro_filters() {
        let mut tracer = TestTracer::new(TraceLevel::Info);

        trace_event!(
            tracer,
            TraceLevel::Info,
            TraceEvent::PhaseStart {
                phase: Phase::ReadAtoms,
            }
        );
        assert_eq!(tracer.events.len(), 1);

        trace_event!(
            tracer,
            TraceLevel::Debug,
            TraceEvent::Registered {
                category: Category::Atom,
                name: "app.str_short",
            }
        );
        assert_eq!(tracer.events.len(), 1);
    }
}
