//! Thread-local compilation cache for anchor and signature patterns.
//!
//! Rule sets rebuild the same regexes on every locate call; compiling them
//! once per thread keeps repeated status checks and sessions cheap.
//! Cache is capped at 256 entries; the whole cache is dropped when full.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static PATTERN_CACHE: RefCell<HashMap<String, Regex>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled pattern from cache, or compile and cache it.
///
/// `Regex` is reference counted internally, so the returned clone shares
/// the compiled program with the cached entry.
pub fn get_or_compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Regex::new(pattern)?;
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    })
}

/// Clear the pattern cache (mainly for testing).
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

/// Number of compiled patterns held by this thread.
pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_compiled_pattern() {
        clear_cache();
        let a = get_or_compile_pattern("commandName.*?partKey").unwrap();
        let b = get_or_compile_pattern("commandName.*?partKey").unwrap();
        assert_eq!(a.as_str(), b.as_str());
        assert_eq!(cache_size(), 1);
    }

    #[test]
    fn invalid_pattern_is_not_cached() {
        clear_cache();
        assert!(get_or_compile_pattern("function (").is_err());
        assert_eq!(cache_size(), 0);
    }
}
