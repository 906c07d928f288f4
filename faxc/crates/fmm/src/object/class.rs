//! Class Ids - compile-time type identity
//!
//! Generated code names every managed type by a positive `u32` class id.
//! The id is written into the object header by `register` and is the only
//! type information the allocator and collector ever see.

use super::header::MAGIC;
use serde::Serialize;
use std::fmt;

/// Positive type id of a registered object
///
/// Never 0 and never `MAGIC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClassId(u32);

impl ClassId {
    /// Canonical backing buffer of arrays and views
    pub const BUFFER: ClassId = ClassId::new(1);

    /// UTF-16 string
    pub const STRING: ClassId = ClassId::new(2);

    /// First id available to generated code
    pub const FIRST_USER: u32 = 16;

    /// Create a class id, rejecting 0 and `MAGIC`
    ///
    /// Usable in constant context, where an invalid id is a compile error.
    pub const fn new(id: u32) -> Self {
        assert!(id != 0, "class id 0 is reserved");
        assert!(id != MAGIC, "class id collides with the scratch sentinel");
        ClassId(id)
    }

    /// Decode a raw header value; `None` for 0 or `MAGIC`
    pub const fn from_raw(id: u32) -> Option<Self> {
        if id == 0 || id == MAGIC {
            None
        } else {
            Some(ClassId(id))
        }
    }

    /// Raw header value
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.0)
    }
}

/// A type the code generator gave a class id
///
/// ```rust
/// use fmm::object::{type_id, ClassId, Managed};
///
/// struct Point;
/// impl Managed for Point {
///     const CLASS_ID: ClassId = ClassId::new(ClassId::FIRST_USER);
/// }
///
/// assert_eq!(type_id::<Point>().get(), 16);
/// ```
pub trait Managed {
    const CLASS_ID: ClassId;
}

/// Class id of `T`, a compile-time constant
#[inline]
pub const fn type_id<T: Managed>() -> ClassId {
    T::CLASS_ID
}

/// Implement `Managed` for a list of types
///
/// ```rust
/// use fmm::managed;
/// use fmm::object::type_id;
///
/// struct Vec2;
/// struct Vec3;
/// managed!(Vec2 => 20, Vec3 => 21);
///
/// assert_eq!(type_id::<Vec3>().get(), 21);
/// ```
#[macro_export]
macro_rules! managed {
    ($($ty:ty => $id:expr),* $(,)?) => {
        $(
            impl $crate::object::Managed for $ty {
                const CLASS_ID: $crate::object::ClassId = $crate::object::ClassId::new($id);
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node;
    managed!(Node => 42);

    #[test]
    fn test_type_id_is_constant() {
        const ID: ClassId = type_id::<Node>();
        assert_eq!(ID.get(), 42);
    }

    #[test]
    fn test_from_raw_rejects_reserved_values() {
        assert_eq!(ClassId::from_raw(0), None);
        assert_eq!(ClassId::from_raw(MAGIC), None);
        assert_eq!(ClassId::from_raw(7), Some(ClassId::new(7)));
    }

    #[test]
    #[should_panic(expected = "reserved")]
    fn test_zero_id_panics() {
        let _ = ClassId::new(std::hint::black_box(0));
    }

    #[test]
    fn test_builtins_below_user_range() {
        assert!(ClassId::BUFFER.get() < ClassId::FIRST_USER);
        assert!(ClassId::STRING.get() < ClassId::FIRST_USER);
        assert_ne!(ClassId::BUFFER, ClassId::STRING);
    }
}
