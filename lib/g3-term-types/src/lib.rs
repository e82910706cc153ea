/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 G3-OSS developers.
 */

mod atom;
pub use atom::{Atom, AtomTable};

mod term;
pub use term::Term;

mod contract;
pub use contract::ContractRegistry;
