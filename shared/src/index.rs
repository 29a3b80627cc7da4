/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The six permuted indexes (SPO, SOP, PSO, POS, OSP, OPS) and the cursor
//! contract the leapfrog trie-join drives (spec.md §4.2, §6 "Backend API
//! consumed"). Out of scope per spec.md §1 is the on-disk key/value engine
//! itself; what lives here is a concrete, in-memory stand-in behind the same
//! `Backend` trait, so the query core has something real to run against.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::term::{Code, Position};
use crate::triple::Triple;

/// One of the six orderings of (S, P, O).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permutation {
    Spo,
    Sop,
    Pso,
    Pos,
    Osp,
    Ops,
}

impl Permutation {
    pub const ALL: [Permutation; 6] =
        [Permutation::Spo, Permutation::Sop, Permutation::Pso, Permutation::Pos, Permutation::Osp, Permutation::Ops];

    /// The SPO/POS/OSP/PSO/SOP/OPS preference order used to break ties in
    /// `best_index_for` (spec.md §4.1.2).
    pub const PREFERENCE_ORDER: [Permutation; 6] =
        [Permutation::Spo, Permutation::Pos, Permutation::Osp, Permutation::Pso, Permutation::Sop, Permutation::Ops];

    /// Lowercase wire tag, e.g. `spo`.
    pub fn tag(self) -> &'static str {
        match self {
            Permutation::Spo => "spo",
            Permutation::Sop => "sop",
            Permutation::Pso => "pso",
            Permutation::Pos => "pos",
            Permutation::Osp => "osp",
            Permutation::Ops => "ops",
        }
    }

    /// The three `Position`s this permutation visits, in storage order.
    pub fn slots(self) -> [Position; 3] {
        use Position::*;
        match self {
            Permutation::Spo => [Subject, Predicate, Object],
            Permutation::Sop => [Subject, Object, Predicate],
            Permutation::Pso => [Predicate, Subject, Object],
            Permutation::Pos => [Predicate, Object, Subject],
            Permutation::Osp => [Object, Subject, Predicate],
            Permutation::Ops => [Object, Predicate, Subject],
        }
    }

    /// Index (0, 1, or 2) of `pos` within this permutation's slot order.
    pub fn index_of(self, pos: Position) -> usize {
        self.slots().iter().position(|&s| s == pos).expect("Position is always one of the three")
    }

    fn key_of(self, t: &Triple) -> [Code; 3] {
        self.slots().map(|pos| pos.pick(t))
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

trait Pick {
    fn pick(self, t: &Triple) -> Code;
}

impl Pick for Position {
    fn pick(self, t: &Triple) -> Code {
        match self {
            Position::Subject => t.subject,
            Position::Predicate => t.predicate,
            Position::Object => t.object,
        }
    }
}

/// A backend read failure (spec.md §7 `BackendFault`). The in-memory
/// reference backend never produces one; it exists so the trait boundary
/// matches a real on-disk engine that can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFault(pub String);

impl fmt::Display for BackendFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend fault: {}", self.0)
    }
}

impl std::error::Error for BackendFault {}

/// The pinned external Backend API (spec.md §6): a snapshot factory and a
/// cursor factory over one index permutation and a fixed key prefix.
pub trait Backend: Send + Sync {
    type Snapshot: Send + Sync;
    type Cursor: Cursor;

    fn snapshot(&self) -> Self::Snapshot;

    fn cursor(
        &self,
        snapshot: &Self::Snapshot,
        index: Permutation,
        prefix: &[Code],
    ) -> Result<Self::Cursor, BackendFault>;
}

/// spec.md §4.2: `open`/`key`/`next`/`seek`/`at_end` over one index
/// permutation and a fixed prefix.
pub trait Cursor {
    /// The code at the slot immediately following the prefix. Only valid
    /// while `!at_end()`.
    fn key(&self) -> Option<Code>;

    /// Advance to the next key whose value at the focus slot is strictly
    /// greater than `key()` and still begins with the prefix.
    fn next(&mut self) -> Result<(), BackendFault>;

    /// Advance to the first key whose value at the focus slot is `>= c` and
    /// still begins with the prefix. No-op if already `>= c`.
    fn seek(&mut self, c: Code) -> Result<(), BackendFault>;

    fn at_end(&self) -> bool;
}

/// In-memory implementation of the six-permutation index store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    spo: BTreeSet<[Code; 3]>,
    sop: BTreeSet<[Code; 3]>,
    pso: BTreeSet<[Code; 3]>,
    pos: BTreeSet<[Code; 3]>,
    osp: BTreeSet<[Code; 3]>,
    ops: BTreeSet<[Code; 3]>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, t: Triple) {
        self.spo.insert(Permutation::Spo.key_of(&t));
        self.sop.insert(Permutation::Sop.key_of(&t));
        self.pso.insert(Permutation::Pso.key_of(&t));
        self.pos.insert(Permutation::Pos.key_of(&t));
        self.osp.insert(Permutation::Osp.key_of(&t));
        self.ops.insert(Permutation::Ops.key_of(&t));
    }

    pub fn extend(&mut self, triples: impl IntoIterator<Item = Triple>) {
        for t in triples {
            self.insert(t);
        }
    }

    /// Bulk-build from a batch of triples: partition into chunks, build a
    /// partial index per chunk in parallel, then merge sequentially. Load
    /// is not part of the single-threaded BGP evaluation this core performs
    /// (spec.md §5), so rayon is fair game here.
    pub fn build_from_triples(triples: &[Triple]) -> Self {
        use rayon::prelude::*;

        if triples.is_empty() {
            return Self::new();
        }
        let num_threads = rayon::current_num_threads().max(1);
        let chunk_size = (triples.len() / num_threads).max(1_000);

        let partials: Vec<InMemoryBackend> = triples
            .par_chunks(chunk_size)
            .map(|chunk| {
                let mut local = InMemoryBackend::new();
                local.extend(chunk.iter().copied());
                local
            })
            .collect();

        let mut merged = InMemoryBackend::new();
        for partial in partials {
            merged.spo.extend(partial.spo);
            merged.sop.extend(partial.sop);
            merged.pso.extend(partial.pso);
            merged.pos.extend(partial.pos);
            merged.osp.extend(partial.osp);
            merged.ops.extend(partial.ops);
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.spo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spo.is_empty()
    }

    fn set_for(&self, index: Permutation) -> &BTreeSet<[Code; 3]> {
        match index {
            Permutation::Spo => &self.spo,
            Permutation::Sop => &self.sop,
            Permutation::Pso => &self.pso,
            Permutation::Pos => &self.pos,
            Permutation::Osp => &self.osp,
            Permutation::Ops => &self.ops,
        }
    }
}

/// A cheap, consistent read view: an `Arc`-shared clone of the six sets at
/// the moment `snapshot()` was called. Independent queries each own an
/// `Arc` clone and never observe later writes (spec.md §5 "the backend
/// store must tolerate multiple concurrent read snapshots").
#[derive(Debug, Clone)]
pub struct InMemorySnapshot(Arc<InMemoryBackend>);

impl Backend for InMemoryBackend {
    type Snapshot = InMemorySnapshot;
    type Cursor = InMemoryCursor;

    fn snapshot(&self) -> Self::Snapshot {
        InMemorySnapshot(Arc::new(self.clone()))
    }

    fn cursor(
        &self,
        snapshot: &Self::Snapshot,
        index: Permutation,
        prefix: &[Code],
    ) -> Result<Self::Cursor, BackendFault> {
        if prefix.len() > 2 {
            return Err(BackendFault(format!("prefix of length {} leaves no slot for the cursor to focus on", prefix.len())));
        }
        let mut cursor = InMemoryCursor {
            snapshot: snapshot.0.clone(),
            index,
            prefix: prefix.to_vec(),
            current: None,
        };
        cursor.seek_focus(0)?;
        Ok(cursor)
    }
}

/// Cursor over `InMemoryBackend`. Implements O(log n) seeks via
/// `BTreeSet::range`, which descends the tree rather than scanning.
#[derive(Debug, Clone)]
pub struct InMemoryCursor {
    snapshot: Arc<InMemoryBackend>,
    index: Permutation,
    prefix: Vec<Code>,
    current: Option<Code>,
}

impl InMemoryCursor {
    fn focus_index(&self) -> usize {
        self.prefix.len()
    }

    /// Find the first stored key that begins with `prefix` and has a focus
    /// value `>= from`, collapsing duplicate focus values (the deeper slot
    /// is left to a sub-cursor at the next join level).
    fn seek_focus(&mut self, from: Code) -> Result<(), BackendFault> {
        let focus = self.focus_index();
        let mut lower = [0u64; 3];
        lower[..focus].copy_from_slice(&self.prefix);
        lower[focus] = from;
        // slots after focus are left at 0 (the minimum), giving the true
        // lower bound for "focus value >= from" within this prefix.

        let set = self.snapshot.set_for(self.index);
        let mut range = set.range(lower..);
        match range.next() {
            Some(key) if key[..focus] == self.prefix[..] => {
                self.current = Some(key[focus]);
            }
            _ => {
                self.current = None;
            }
        }
        Ok(())
    }
}

impl Cursor for InMemoryCursor {
    fn key(&self) -> Option<Code> {
        self.current
    }

    fn next(&mut self) -> Result<(), BackendFault> {
        match self.current {
            None => Ok(()),
            Some(cur) => match cur.checked_add(1) {
                Some(next_from) => self.seek_focus(next_from),
                None => {
                    self.current = None;
                    Ok(())
                }
            },
        }
    }

    fn seek(&mut self, c: Code) -> Result<(), BackendFault> {
        match self.current {
            Some(cur) if cur >= c => Ok(()),
            None => Ok(()),
            _ => self.seek_focus(c),
        }
    }

    fn at_end(&self) -> bool {
        self.current.is_none()
    }
}
