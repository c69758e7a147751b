//! Entity identity for throttling.
//!
//! An entity is the unit that throttling state is keyed on: a container name
//! paired with the image tag it runs. Two events with the same key share one
//! sliding window and one suspension state.

use std::fmt;

/// Composite identity `(name, image_tag)` of a monitored container.
///
/// Keys are compared by value. A container recreated under the same name and
/// image keeps sharing state with its predecessor until that state is reclaimed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    name: String,
    image_tag: String,
}

impl EntityKey {
    /// Create a key from a container name and image tag.
    pub fn new(name: impl Into<String>, image_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_tag: image_tag.into(),
        }
    }

    /// Container name (or the `notidock.name` override).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Image tag the container was started from.
    pub fn image_tag(&self) -> &str {
        &self.image_tag
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.image_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_compare_by_value() {
        let a = EntityKey::new("web", "nginx:1.25");
        let b = EntityKey::new(String::from("web"), String::from("nginx:1.25"));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_name_and_tag_both_distinguish() {
        let base = EntityKey::new("a", "x");
        assert_ne!(base, EntityKey::new("a", "y"));
        assert_ne!(base, EntityKey::new("b", "x"));
    }

    #[test]
    fn test_display() {
        let key = EntityKey::new("db", "postgres:16");
        assert_eq!(key.to_string(), "db (postgres:16)");
    }
}
