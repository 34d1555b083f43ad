//! Unique identifiers for IR entities.
//!
//! Every id is a `u32` index into an arena owned by [`Module`](crate::ir::Module).
//! Identity of declarations is by id: a rewrite never mutates a declaration
//! into a different shape, it allocates a new one and records the mapping.

use serde::Serialize;
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize)]
        pub struct $name(pub u32);

        impl $name {
            pub const INVALID: $name = $name(u32::MAX);

            pub fn new(index: u32) -> Self {
                Self(index)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A callable declaration: function, accessor, constructor or lambda.
    DeclId,
    "decl"
);

define_id!(
    /// A declaration container (a file or a class).
    ContainerId,
    "container"
);

define_id!(
    /// A value symbol: parameter, receiver or local variable.
    ///
    /// Allocated module-wide so a `GetValue` stays meaningful when an
    /// expression moves between declarations.
    ValueId,
    "value"
);

define_id!(
    /// A type parameter of a declaration.
    TypeParamId,
    "tparam"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decl_id() {
        let id = DeclId::new(42);
        assert_eq!(id.index(), 42);
        assert!(id.is_valid());
        assert!(!DeclId::INVALID.is_valid());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(DeclId::new(3).to_string(), "decl#3");
        assert_eq!(ValueId::new(7).to_string(), "value#7");
        assert_eq!(ContainerId::new(0).to_string(), "container#0");
        assert_eq!(TypeParamId::new(1).to_string(), "tparam#1");
    }
}
