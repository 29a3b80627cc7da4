/*
 * Copyright © 2024 ladroid
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;

use crate::term::{code_addr, make_code, Code, Term, TermKind};

/// Bijection between RDF terms and the fixed-width `Code`s the six indexes
/// sort on (§6 "Dictionary API consumed").
///
/// This is the in-memory reference implementation of the dictionary pinned
/// by spec.md §6; a production deployment backs it by an on-disk structure,
/// which is out of scope for the query execution core (spec.md §1).
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    term_to_code: HashMap<Term, Code>,
    code_to_term: HashMap<Code, Term>,
    next_addr: [u64; 6],
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `term` if not already present and return its code. Used when
    /// loading data; not part of the pinned read-only query-time API.
    pub fn insert(&mut self, term: Term) -> Code {
        if let Some(&code) = self.term_to_code.get(&term) {
            return code;
        }
        let kind = TermKind::of(&term);
        let slot = kind as usize - 1;
        let addr = self.next_addr[slot];
        self.next_addr[slot] += 1;
        let code = make_code(kind, addr);
        self.term_to_code.insert(term.clone(), code);
        self.code_to_term.insert(code, term);
        code
    }

    /// `encode(term) -> code_or_miss` (§6). Read-only: never inserts.
    pub fn encode(&self, term: &Term) -> Option<Code> {
        self.term_to_code.get(term).copied()
    }

    /// `decode(code) -> term` (§6).
    pub fn decode(&self, code: Code) -> Option<&Term> {
        self.code_to_term.get(&code)
    }

    pub fn len(&self) -> usize {
        self.term_to_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_to_code.is_empty()
    }
}

/// Just the address-assignment side of `TermKind::of`, exposed so backends
/// that pre-sort terms by kind can validate invariants in tests.
pub fn addr_of(code: Code) -> u64 {
    code_addr(code)
}
