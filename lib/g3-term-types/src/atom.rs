/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

use std::collections::HashSet;
use std::fmt;
use std::sync::RwLock;

use foldhash::fast::FixedState;
use smol_str::SmolStr;

/// A symbolic name. Cheap to clone, compared by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(SmolStr);

impl Atom {
    pub fn new(name: &str) -> Self {
        Atom(SmolStr::new(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for Atom {
    fn from(name: &str) -> Self {
        Atom::new(name)
    }
}

impl AsRef<str> for Atom {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// The set of atom names known to the runtime.
///
/// Decoding in safe mode may only reference names already present here,
/// in which case the table is consulted through [`AtomTable::get`].
/// Outside safe mode new names go through [`AtomTable::insert`].
/// Readers run concurrently; the codec only ever holds a shared
/// reference.
pub struct AtomTable {
    known: RwLock<HashSet<SmolStr, FixedState>>,
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomTable {
    pub fn new() -> Self {
        AtomTable {
            known: RwLock::new(HashSet::with_hasher(FixedState::with_seed(0))),
        }
    }

    /// Intern `name`, registering it if previously unknown.
    pub fn insert(&self, name: &str) -> Atom {
        let mut set = self.known.write().unwrap();
        match set.get(name) {
            Some(v) => Atom(v.clone()),
            None => {
                let v = SmolStr::new(name);
                set.insert(v.clone());
                Atom(v)
            }
        }
    }

    /// Look up an already known name.
    pub fn get(&self, name: &str) -> Option<Atom> {
        let set = self.known.read().unwrap();
        set.get(name).map(|v| Atom(v.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        let set = self.known.read().unwrap();
        set.contains(name)
    }

    pub fn len(&self) -> usize {
        let set = self.known.read().unwrap();
        set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
