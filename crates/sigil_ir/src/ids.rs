//! Opaque ID newtypes for IR entities.
//!
//! Each ID is a thin `u32` wrapper created by [`Arena::alloc`](crate::arena::Arena::alloc).

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// A linked module (one per library archive or in-memory module).
    ModuleId
);

define_id!(
    /// A file inside a linked module.
    FileId
);

define_id!(
    /// A materialized declaration.
    DeclId
);

define_id!(
    /// A symbol: the handle every IR reference goes through.
    SymbolId
);

define_id!(
    /// A loop construct, referenced by its body's `break`/`continue` jumps.
    LoopId
);
