use crate::collections::DArray;
use crate::device::UniformLocation;

use super::uniform::{UniformKind, UniformValue};

/// Initial capacity of both per-program caches.
const CACHE_CAPACITY: usize = 92;

/// Resolved uniform locations by name.
///
/// Lookups scan linearly; programs rarely carry more than a few dozen
/// uniforms.
#[derive(Debug)]
pub struct UniformLocationCache {
    entries: DArray<(String, UniformLocation)>,
}

impl UniformLocationCache {
    pub fn new() -> Self {
        Self {
            entries: DArray::with_capacity(CACHE_CAPACITY),
        }
    }

    pub fn get(&self, name: &str) -> Option<UniformLocation> {
        self.entries.find(|(n, _)| n == name).map(|(_, (_, loc))| *loc)
    }

    pub fn insert(&mut self, name: &str, location: UniformLocation) {
        match self.entries.find_mut(|(n, _)| n == name) {
            Some((_, entry)) => entry.1 = location,
            None => self.entries.push((name.to_string(), location)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.entries.shrink();
    }
}

impl Default for UniformLocationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct CachedValue {
    location: UniformLocation,
    kind: UniformKind,
    value: UniformValue,
}

/// Last value written per `(location, kind)`.
#[derive(Debug)]
pub struct UniformValueCache {
    entries: DArray<CachedValue>,
}

impl UniformValueCache {
    pub fn new() -> Self {
        Self {
            entries: DArray::with_capacity(CACHE_CAPACITY),
        }
    }

    /// Records `value` and reports whether it differs from the cached one.
    ///
    /// Returns `false` when the write would be redundant.
    pub fn update(&mut self, location: UniformLocation, value: UniformValue) -> bool {
        let kind = value.kind();
        match self
            .entries
            .find_mut(|e| e.location == location && e.kind == kind)
        {
            Some((_, cached)) if cached.value.approx_eq(&value) => false,
            Some((_, cached)) => {
                cached.value = value;
                true
            }
            None => {
                self.entries.push(CachedValue { location, kind, value });
                true
            }
        }
    }

    pub fn get(&self, location: UniformLocation, kind: UniformKind) -> Option<UniformValue> {
        self.entries
            .find(|e| e.location == location && e.kind == kind)
            .map(|(_, e)| e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.entries.shrink();
    }
}

impl Default for UniformValueCache {
    fn default() -> Self {
        Self::new()
    }
}
