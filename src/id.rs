//! Identity types for the rig graph.
//!
//! All IDs are newtypes over `u32` that index directly into their owning
//! storage vector inside a [`Scene`](crate::scene::Scene).

use std::fmt;

/// Index into the scene's transform nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Index into the scene's attribute registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrId(pub u32);

/// Index into the scene's expression nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

macro_rules! impl_id {
    ($ty:ident) => {
        impl $ty {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($ty), "({})"), self.0)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

impl_id!(NodeId);
impl_id!(AttrId);
impl_id!(ExprId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_index_their_storage() {
        assert_eq!(NodeId(42).index(), 42);
        assert_eq!(AttrId::from_index(7), AttrId(7));
        assert_eq!(format!("{}", ExprId(3)), "ExprId(3)");
    }
}
