/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

use std::collections::HashMap;

use foldhash::fast::FixedState;
use smol_str::SmolStr;

use crate::{Atom, AtomTable};

/// Read-mostly lookup service consulted by both codec directions.
///
/// Holds the record schemas, keyed by `(name, arity)` with arity being
/// the field count, and the table of known atom names. Registration
/// happens at setup time through `&mut self`; afterwards the registry is
/// shared behind `Arc` and only read.
pub struct ContractRegistry {
    records: HashMap<(SmolStr, usize), Vec<Atom>, FixedState>,
    atoms: AtomTable,
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractRegistry {
    pub fn new() -> Self {
        ContractRegistry {
            records: HashMap::with_hasher(FixedState::with_seed(0)),
            atoms: AtomTable::new(),
        }
    }

    /// Register a record schema. The record name and all field names
    /// become known atoms.
    pub fn add_record(&mut self, name: &str, field_names: &[&str]) {
        let fields: Vec<Atom> = field_names.iter().map(|f| self.atoms.insert(f)).collect();
        self.atoms.insert(name);
        self.records.insert((SmolStr::new(name), fields.len()), fields);
    }

    /// All registered `(name, arity)` pairs.
    pub fn records(&self) -> impl Iterator<Item = (&str, usize)> {
        self.records.keys().map(|(name, arity)| (name.as_str(), *arity))
    }

    /// The ordered field names of record `name` with `arity` fields.
    pub fn record_fields(&self, name: &str, arity: usize) -> Option<&[Atom]> {
        self.records
            .get(&(SmolStr::new(name), arity))
            .map(|v| v.as_slice())
    }

    #[inline]
    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }
}
