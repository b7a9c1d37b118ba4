//! Element Attributes
//!
//! Ordered name/value pairs with two representations:
//! - `Shareable`: immutable, `Rc`-backed, aliased by clones and by parser
//!   output deduplicated through [`ElementDataCache`]
//! - `Unique`: owned by exactly one element and mutable
//!
//! Every direct mutation goes through [`AttributeData::ensure_unique`] first.

use std::collections::HashSet;
use std::rc::Rc;

/// Single attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is_id(&self) -> bool {
        self.name == "id"
    }
}

/// Immutable attribute block that may back several elements
pub type ShareableAttributes = Rc<[Attribute]>;

/// Attribute storage for one element
#[derive(Debug, Clone)]
pub enum AttributeData {
    Shareable(ShareableAttributes),
    Unique(Vec<Attribute>),
}

impl Default for AttributeData {
    fn default() -> Self {
        Self::Unique(Vec::new())
    }
}

impl AttributeData {
    pub fn from_shared(shared: ShareableAttributes) -> Self {
        Self::Shareable(shared)
    }

    pub fn as_slice(&self) -> &[Attribute] {
        match self {
            Self::Shareable(shared) => shared,
            Self::Unique(owned) => owned,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.as_slice().iter().position(|a| a.name == name)
    }

    /// Get attribute value (never changes the representation)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.as_slice()
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn is_unique(&self) -> bool {
        matches!(self, Self::Unique(_))
    }

    /// Copy-on-write trigger: detach from any shared block
    pub fn ensure_unique(&mut self) -> &mut Vec<Attribute> {
        if let Self::Shareable(shared) = self {
            tracing::trace!(count = shared.len(), "Uniquifying shared attribute block");
            *self = Self::Unique(shared.to_vec());
        }
        match self {
            Self::Unique(owned) => owned,
            Self::Shareable(_) => unreachable!("attribute data was just uniquified"),
        }
    }

    /// Freeze into a shareable block and return a handle to it
    pub fn make_shareable(&mut self) -> ShareableAttributes {
        if let Self::Unique(owned) = self {
            let shared: ShareableAttributes = Rc::from(std::mem::take(owned));
            *self = Self::Shareable(shared);
        }
        match self {
            Self::Shareable(shared) => Rc::clone(shared),
            Self::Unique(_) => unreachable!("attribute data was just frozen"),
        }
    }

    /// True when both sides alias the same shared block
    pub fn shares_storage_with(&self, other: &AttributeData) -> bool {
        match (self, other) {
            (Self::Shareable(a), Self::Shareable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Content-keyed cache of shareable attribute blocks for parser-created
/// elements
///
/// When full, blocks no element references any more are purged before a new
/// one is admitted. A block that still does not fit is handed out uncached.
#[derive(Debug)]
pub struct ElementDataCache {
    entries: HashSet<ShareableAttributes>,
    capacity: usize,
}

impl ElementDataCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashSet::new(),
            capacity,
        }
    }

    /// Return the cached block equal to `attrs`, inserting it if absent
    pub fn cached_shareable(&mut self, attrs: Vec<Attribute>) -> ShareableAttributes {
        if let Some(existing) = self.entries.get(attrs.as_slice()) {
            return Rc::clone(existing);
        }
        if self.entries.len() >= self.capacity {
            self.purge_unused();
        }
        let shared: ShareableAttributes = Rc::from(attrs);
        if self.entries.len() < self.capacity {
            self.entries.insert(Rc::clone(&shared));
        }
        shared
    }

    /// Drop blocks held only by the cache, returns how many were dropped
    pub fn purge_unused(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|shared| Rc::strong_count(shared) > 1);
        let purged = before - self.entries.len();
        if purged > 0 {
            tracing::trace!(purged, "Purged unused attribute blocks");
        }
        purged
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<Attribute> {
        pairs.iter().map(|(n, v)| Attribute::new(*n, *v)).collect()
    }

    #[test]
    fn test_get_does_not_uniquify() {
        let mut cache = ElementDataCache::new(8);
        let data = AttributeData::from_shared(cache.cached_shareable(attrs(&[("class", "btn")])));

        assert_eq!(data.get("class"), Some("btn"));
        assert_eq!(data.get("id"), None);
        assert!(!data.is_unique());
    }

    #[test]
    fn test_ensure_unique_copies_shared_block() {
        let mut original = AttributeData::Unique(attrs(&[("id", "a")]));
        let shared = original.make_shareable();
        let mut copy = AttributeData::from_shared(shared);
        assert!(copy.shares_storage_with(&original));

        copy.ensure_unique()[0].value = "b".into();

        assert!(!copy.shares_storage_with(&original));
        assert_eq!(original.get("id"), Some("a"));
        assert_eq!(copy.get("id"), Some("b"));
    }

    #[test]
    fn test_cache_dedupes_by_content() {
        let mut cache = ElementDataCache::new(8);
        let a = cache.cached_shareable(attrs(&[("type", "text"), ("name", "q")]));
        let b = cache.cached_shareable(attrs(&[("type", "text"), ("name", "q")]));
        let c = cache.cached_shareable(attrs(&[("name", "q"), ("type", "text")]));

        assert!(Rc::ptr_eq(&a, &b));
        // Order is part of the content
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_purges_unused_when_full() {
        let mut cache = ElementDataCache::new(1);
        let first = cache.cached_shareable(attrs(&[("a", "1")]));
        drop(first);

        let second = cache.cached_shareable(attrs(&[("b", "2")]));
        assert_eq!(cache.len(), 1);

        // Still referenced: the next block is handed out uncached
        let third = cache.cached_shareable(attrs(&[("c", "3")]));
        assert_eq!(cache.len(), 1);
        assert!(!Rc::ptr_eq(&second, &third));
    }
}
