/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

use crate::Atom;

/// A dynamically typed value as exchanged by the RPC runtime.
///
/// `String` is a sequence of code points and is distinct from `Binary`.
/// `PropList` keeps its entries in insertion order; keys and values are
/// arbitrary terms. `Record` is a named tuple whose field order follows
/// the schema registered in the contract registry.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Binary(Vec<u8>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Atom(Atom),
    String(String),
    List(Vec<Term>),
    Tuple(Vec<Term>),
    PropList(Vec<(Term, Term)>),
    Record { name: Atom, fields: Vec<Term> },
}

impl Term {
    pub fn atom(name: &str) -> Self {
        Term::Atom(Atom::new(name))
    }

    pub fn record(name: &str, fields: Vec<Term>) -> Self {
        Term::Record {
            name: Atom::new(name),
            fields,
        }
    }
}

impl From<i64> for Term {
    fn from(v: i64) -> Self {
        Term::Int(v)
    }
}

impl From<f64> for Term {
    fn from(v: f64) -> Self {
        Term::Float(v)
    }
}

impl From<bool> for Term {
    fn from(v: bool) -> Self {
        Term::Bool(v)
    }
}

impl From<&str> for Term {
    fn from(v: &str) -> Self {
        Term::String(v.to_string())
    }
}
