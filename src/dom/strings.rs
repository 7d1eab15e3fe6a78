//! String Interning Pool
//!
//! Efficient string storage for a document arena:
//! - Names and namespace URIs are interned (deduplicated)
//! - Character data is appended without a lookup, since it rarely repeats
//!
//! Id 0 is reserved for the empty string so nodes can default to it.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct StringPool {
    /// Entries indexed by string ID
    strings: Vec<Box<str>>,
    /// Interned content -> ID
    index: HashMap<Box<str>, u32>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        let mut strings = Vec::with_capacity(256);
        strings.push(Box::from(""));
        StringPool {
            strings,
            index: HashMap::new(),
        }
    }

    /// Intern a string, returning the existing ID when already present
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(Box::from(s));
        self.index.insert(Box::from(s), id);
        id
    }

    /// Store a string without deduplication
    pub fn push(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        let id = self.strings.len() as u32;
        self.strings.push(Box::from(s));
        id
    }

    /// Look up an already interned string
    pub fn lookup(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        self.index.get(s).copied()
    }

    /// Resolve an ID; unknown IDs resolve to the empty string
    #[inline]
    pub fn get(&self, id: u32) -> &str {
        self.strings.get(id as usize).map(|s| &**s).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut pool = StringPool::new();
        let a = pool.intern("element");
        let b = pool.intern("element");
        assert_eq!(a, b);
        assert_eq!(pool.get(a), "element");
    }

    #[test]
    fn test_empty_is_zero() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.push(""), 0);
        assert_eq!(pool.get(0), "");
        assert!(pool.is_empty());
    }

    #[test]
    fn test_push_does_not_dedup() {
        let mut pool = StringPool::new();
        let a = pool.push("text");
        let b = pool.push("text");
        assert_ne!(a, b);
        assert_eq!(pool.lookup("text"), None);
    }

    #[test]
    fn test_unknown_id() {
        let pool = StringPool::new();
        assert_eq!(pool.get(999), "");
    }
}
