//! Component names and value types

use std::any::{Any, TypeId};
use std::borrow::{Borrow, Cow};
use std::fmt;

/// Names the engine keeps for itself; systems may not require them
pub const RESERVED_NAMES: &[&str] = &["entity", "eid"];

/// Marker for types that can be stored as component values
///
/// Automatically implemented for all `Any + Send + Sync` types.
pub trait Component: Any + Send + Sync {}

impl<T: Any + Send + Sync> Component for T {}

/// The stable key a component is stored under on an entity
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentName(Cow<'static, str>);

impl ComponentName {
    /// A name known at compile time
    pub const fn new_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of [`RESERVED_NAMES`]
    pub fn is_reserved(&self) -> bool {
        RESERVED_NAMES.contains(&self.as_str())
    }
}

impl From<&'static str> for ComponentName {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for ComponentName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl AsRef<str> for ComponentName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for ComponentName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for ComponentName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

/// Runtime tag for the Rust type of a component value
#[derive(Clone, Copy, Debug)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    /// The tag of `T`
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type's name, for diagnostics only
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names() {
        assert!(ComponentName::from("entity").is_reserved());
        assert!(ComponentName::from("eid".to_string()).is_reserved());
        assert!(!ComponentName::new_static("pos").is_reserved());
    }

    #[test]
    fn test_owned_and_static_names_match() {
        assert_eq!(ComponentName::from("pos"), ComponentName::from("pos".to_string()));
        assert_eq!(ComponentName::from("pos").to_string(), "pos");
    }

    #[test]
    fn test_component_type_identity() {
        assert_eq!(ComponentType::of::<u32>(), ComponentType::of::<u32>());
        assert_ne!(ComponentType::of::<u32>(), ComponentType::of::<i32>());
        assert_eq!(ComponentType::of::<u32>().name(), "u32");
    }
}
