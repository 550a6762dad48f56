//! Newtype wrappers around [`crate::arena::Index`] so a `RoadIndex` can't be
//! passed where a `VehicleIndex` is expected.

use crate::arena::Index;
use serde::Serialize;
use std::fmt;

macro_rules! index_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub Index);

        impl From<Index> for $name {
            fn from(idx: Index) -> Self {
                $name(idx)
            }
        }

        impl From<$name> for Index {
            fn from(wrapped: $name) -> Index {
                wrapped.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0 .0)
            }
        }
    };
}

index_newtype!(VehicleIndex);
index_newtype!(RoadIndex);
index_newtype!(JunctionIndex);
