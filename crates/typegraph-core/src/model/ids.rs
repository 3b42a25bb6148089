//! Index types for schema storage.
//!
//! Using `NonZeroU32` enables `Option<T>` niche optimization (no extra space).

use core::num::NonZeroU32;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Create from a raw index (1-based).
            #[must_use]
            pub const fn from_raw(raw: u32) -> Option<Self> {
                match NonZeroU32::new(raw) {
                    Some(n) => Some(Self(n)),
                    None => None,
                }
            }

            /// Create from a 0-based index.
            #[must_use]
            pub fn from_index(index: usize) -> Option<Self> {
                if index >= (u32::MAX - 1) as usize {
                    return None;
                }
                Self::from_raw(index as u32 + 1)
            }

            /// Placeholder id used before the definition is added to storage.
            #[must_use]
            pub const fn placeholder() -> Self {
                match NonZeroU32::new(u32::MAX) {
                    Some(n) => Self(n),
                    None => unreachable!(),
                }
            }

            /// Get the raw value (1-based).
            #[must_use]
            pub const fn to_raw(self) -> u32 {
                self.0.get()
            }

            /// Get the 0-based index.
            #[must_use]
            pub const fn to_index(self) -> usize {
                (self.0.get() - 1) as usize
            }
        }
    };
}

define_id!(
    /// Atom definition identifier.
    AtomId
);

define_id!(
    /// Link definition identifier.
    LinkId
);

define_id!(
    /// Concept definition identifier.
    ConceptId
);
