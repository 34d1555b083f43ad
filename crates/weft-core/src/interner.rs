//! Shared string interner for declaration, parameter and container names.
//!
//! Synthetic names (`$composer`, `$changed1`, `Foo$composable0`) go through
//! the same interner as user names so they compare by handle.

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

/// An interned string handle.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Serialize)]
pub struct Name(pub u32);

/// A cheaply clonable interned string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ArcStr(Arc<str>);

impl fmt::Display for ArcStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ArcStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl Borrow<str> for ArcStr {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for ArcStr {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Default)]
struct Tables {
    map: HashMap<ArcStr, Name>,
    strings: Vec<ArcStr>,
}

/// A thread-safe string interner.
#[derive(Debug, Default)]
pub struct Interner {
    tables: Mutex<Tables>,
}

impl Interner {
    pub fn new() -> Interner {
        Interner::default()
    }

    /// Intern a string, returning the existing handle if already present.
    pub fn intern(&self, s: &str) -> Name {
        let mut tables = self.tables.lock();

        if let Some(&name) = tables.map.get(s) {
            return name;
        }

        let key = ArcStr(Arc::from(s));
        let name = Name(tables.strings.len() as u32);
        tables.strings.push(key.clone());
        tables.map.insert(key, name);
        name
    }

    /// Look a string up without interning it.
    pub fn get(&self, s: &str) -> Option<Name> {
        self.tables.lock().map.get(s).copied()
    }

    /// The string behind a handle.
    pub fn str(&self, name: Name) -> ArcStr {
        self.tables.lock().strings[name.0 as usize].clone()
    }

    pub fn len(&self) -> usize {
        self.tables.lock().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedupes() {
        let interner = Interner::new();

        let a = interner.intern("Greeting");
        let b = interner.intern("$composer");
        assert_eq!(a, interner.intern("Greeting"));
        assert_ne!(a, b);

        assert_eq!(&*interner.str(a), "Greeting");
        assert_eq!(&*interner.str(b), "$composer");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_get_does_not_insert() {
        let interner = Interner::new();
        assert_eq!(interner.get("missing"), None);
        assert!(interner.is_empty());

        let name = interner.intern("present");
        assert_eq!(interner.get("present"), Some(name));
    }
}
