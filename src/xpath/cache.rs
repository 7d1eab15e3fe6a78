//! Compiled expression cache
//!
//! A process-wide LRU of compiled XPath expressions keyed by source text.
//! It only exists between [`crate::init`] and the matching teardown; without
//! it every lookup compiles afresh.

use super::compiler::{self, CompiledExpr};
use crate::error::Result;
use log::{debug, trace};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

static CACHE: Mutex<Option<LruCache<String, Arc<CompiledExpr>>>> = Mutex::new(None);

fn lock() -> MutexGuard<'static, Option<LruCache<String, Arc<CompiledExpr>>>> {
    CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Create the cache. A capacity of zero leaves caching off.
pub(crate) fn install(capacity: usize) {
    let mut cache = lock();
    *cache = NonZeroUsize::new(capacity).map(LruCache::new);
    debug!("XPath cache installed with capacity {}", capacity);
}

/// Drop the cache and everything in it
pub(crate) fn uninstall() {
    let mut cache = lock();
    if let Some(old) = cache.take() {
        debug!("XPath cache removed ({} entries)", old.len());
    }
}

/// Number of cached expressions
pub fn len() -> usize {
    lock().as_ref().map_or(0, LruCache::len)
}

/// Whether the cache is currently installed
pub fn is_active() -> bool {
    lock().is_some()
}

/// Fetch a compiled expression, compiling and caching it on a miss
pub fn get_or_compile(xpath: &str) -> Result<Arc<CompiledExpr>> {
    if let Some(cache) = lock().as_mut() {
        if let Some(hit) = cache.get(xpath) {
            trace!("XPath cache hit: {}", xpath);
            return Ok(Arc::clone(hit));
        }
    }

    // Compile outside the lock
    let compiled = Arc::new(compiler::compile(xpath)?);
    if let Some(cache) = lock().as_mut() {
        debug!("XPath cache miss: {}", xpath);
        cache.put(xpath.to_string(), Arc::clone(&compiled));
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninstalled_cache_still_compiles() {
        // The cache is global; only assert on behavior that holds either way
        let compiled = get_or_compile("count(//x)").unwrap();
        assert!(!compiled.ops.is_empty());
        assert!(get_or_compile("count(").is_err());
    }
}
