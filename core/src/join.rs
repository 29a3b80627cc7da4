/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The leapfrog trie-join driver (spec.md §4.3). One [`LevelState`] per
//! variable in the plan's order, held on an explicit stack rather than as
//! recursive generator state, so a single tuple can be pulled at a time and
//! the whole search suspended between tuples (spec.md §5, §9 design notes).

use std::collections::HashMap;

use log::trace;
use triejoin_shared::dictionary::Dictionary;
use triejoin_shared::index::{Backend, BackendFault, Cursor, Permutation};
use triejoin_shared::term::{Code, PatternSlot, TriplePattern};

use crate::cancel::CancellationToken;
use crate::error::QueryError;
use crate::planner::{self, Plan};

/// Wraps a real backend cursor, or stands in for one when a pattern's
/// constant has no dictionary code at all (spec.md §7: a dictionary miss is
/// an empty join for that pattern, not an error).
enum MaybeCursor<C> {
    Real(C),
    Null,
}

impl<C: Cursor> Cursor for MaybeCursor<C> {
    fn key(&self) -> Option<Code> {
        match self {
            MaybeCursor::Real(c) => c.key(),
            MaybeCursor::Null => None,
        }
    }

    fn next(&mut self) -> Result<(), BackendFault> {
        match self {
            MaybeCursor::Real(c) => c.next(),
            MaybeCursor::Null => Ok(()),
        }
    }

    fn seek(&mut self, c: Code) -> Result<(), BackendFault> {
        match self {
            MaybeCursor::Real(cur) => cur.seek(c),
            MaybeCursor::Null => Ok(()),
        }
    }

    fn at_end(&self) -> bool {
        match self {
            MaybeCursor::Real(c) => c.at_end(),
            MaybeCursor::Null => true,
        }
    }
}

/// The open cursors for one variable in the plan's order, and the value (if
/// any) currently agreed on across all of them.
struct LevelState<C> {
    entries: Vec<(usize, C)>,
    current: Option<Code>,
}

impl<C: Cursor> LevelState<C> {
    /// Repeated seek-to-max until every cursor's focus value agrees, or one
    /// runs out (spec.md §4.3.1). Re-derives the min/max pair from scratch
    /// each round instead of maintaining a sorted index array incrementally
    /// — same worst-case behaviour for the small arities a triple pattern
    /// join produces, and easier to get right without a compiler to check it
    /// against.
    fn search(&mut self) -> Result<Option<Code>, BackendFault> {
        loop {
            if self.entries.iter().any(|(_, c)| c.at_end()) {
                return Ok(None);
            }
            let min = self.entries.iter().map(|(_, c)| c.key().unwrap()).min().unwrap();
            let max = self.entries.iter().map(|(_, c)| c.key().unwrap()).max().unwrap();
            if min == max {
                return Ok(Some(min));
            }
            for (_, c) in self.entries.iter_mut() {
                if c.key() == Some(min) {
                    c.seek(max)?;
                }
            }
        }
    }

    /// Move past the value this level is currently sitting on, if any.
    fn advance(&mut self) -> Result<(), BackendFault> {
        if self.current.take().is_some() {
            self.entries[0].1.next()?;
        }
        Ok(())
    }
}

/// Pull-based evaluator for one plan over one backend snapshot. Each call to
/// [`JoinDriver::next`] returns the next result tuple (codes in `plan.order`
/// order) or `None` once the search is exhausted.
pub struct JoinDriver<'b, B: Backend> {
    plan: Plan,
    patterns: Vec<TriplePattern>,
    dictionary: &'b Dictionary,
    backend: &'b B,
    snapshot: B::Snapshot,
    cancel: CancellationToken,
    stack: Vec<LevelState<MaybeCursor<B::Cursor>>>,
    bindings: HashMap<String, Code>,
    started: bool,
}

impl<'b, B: Backend> JoinDriver<'b, B> {
    pub fn new(
        plan: Plan,
        patterns: Vec<TriplePattern>,
        dictionary: &'b Dictionary,
        backend: &'b B,
        cancel: CancellationToken,
    ) -> Self {
        let snapshot = backend.snapshot();
        Self {
            plan,
            patterns,
            dictionary,
            backend,
            snapshot,
            cancel,
            stack: Vec::new(),
            bindings: HashMap::new(),
            started: false,
        }
    }

    pub fn order(&self) -> &[String] {
        &self.plan.order
    }

    /// Pull the next binding tuple. `Ok(None)` means the search is done, not
    /// that this call suspended — there is nothing left to resume.
    pub fn next(&mut self) -> Result<Option<Vec<Code>>, QueryError> {
        if self.cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        if self.plan.order.is_empty() {
            return self.next_ground();
        }

        if !self.started {
            self.started = true;
            let level0 = self.open_level(0)?;
            self.stack.push(level0);
        } else if let Some(top) = self.stack.last_mut() {
            top.advance().map_err(QueryError::from)?;
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            let depth = match self.stack.len().checked_sub(1) {
                Some(d) => d,
                None => return Ok(None),
            };
            debug_assert!(self.stack[depth].current.is_none());

            match self.stack[depth].search().map_err(QueryError::from)? {
                Some(v) => {
                    self.stack[depth].current = Some(v);
                    let var = self.plan.order[depth].clone();
                    trace!("bound ?{var} = {v}");
                    self.bindings.insert(var, v);

                    if depth + 1 == self.plan.order.len() {
                        let tuple =
                            self.plan.order.iter().map(|name| self.bindings[name]).collect();
                        return Ok(Some(tuple));
                    }
                    let child = self.open_level(depth + 1)?;
                    self.stack.push(child);
                }
                None => {
                    let var = self.plan.order[depth].clone();
                    self.bindings.remove(&var);
                    self.stack.pop();
                    if let Some(parent) = self.stack.last_mut() {
                        parent.advance().map_err(QueryError::from)?;
                    }
                }
            }
        }
    }

    /// A plan with no free variables (every pattern fully ground): check
    /// membership once and yield a single empty tuple, or nothing.
    fn next_ground(&mut self) -> Result<Option<Vec<Code>>, QueryError> {
        if self.started {
            return Ok(None);
        }
        self.started = true;
        for pattern in &self.patterns {
            if !self.ground_pattern_matches(pattern)? {
                return Ok(None);
            }
        }
        Ok(Some(Vec::new()))
    }

    fn ground_pattern_matches(&self, pattern: &TriplePattern) -> Result<bool, QueryError> {
        let s = pattern.subject.as_constant().and_then(|t| self.dictionary.encode(t));
        let p = pattern.predicate.as_constant().and_then(|t| self.dictionary.encode(t));
        let o = pattern.object.as_constant().and_then(|t| self.dictionary.encode(t));
        let (s, p, o) = match (s, p, o) {
            (Some(s), Some(p), Some(o)) => (s, p, o),
            _ => return Ok(false),
        };
        let cursor = self.backend.cursor(&self.snapshot, Permutation::Spo, &[s, p])?;
        Ok(cursor.key() == Some(o))
    }

    fn open_level(&self, depth: usize) -> Result<LevelState<MaybeCursor<B::Cursor>>, QueryError> {
        let var = self.plan.order[depth].clone();
        let mut entries = Vec::new();
        for (pattern_idx, pattern) in self.patterns.iter().enumerate() {
            if !pattern.variables().any(|v| v.name() == var) {
                continue;
            }
            let strat = self.plan.strategy_for(pattern_idx, &var).ok_or_else(|| {
                QueryError::PlanInfeasible { variable: var.clone(), pattern_index: pattern_idx }
            })?;
            let target_pos = planner::position_of(&var, pattern).ok_or_else(|| {
                QueryError::PlanInfeasible { variable: var.clone(), pattern_index: pattern_idx }
            })?;
            let target_idx = strat.index.index_of(target_pos);
            let slots = strat.index.slots();

            let mut prefix = Vec::with_capacity(target_idx);
            let mut miss = false;
            for &pos in &slots[..target_idx] {
                let code = match pattern.slot(pos) {
                    PatternSlot::Constant(term) => match self.dictionary.encode(term) {
                        Some(c) => c,
                        None => {
                            miss = true;
                            break;
                        }
                    },
                    PatternSlot::Variable(v) => *self
                        .bindings
                        .get(v.name())
                        .expect("prefix variable must already be bound by the planner's order"),
                };
                prefix.push(code);
            }

            let cursor = if miss {
                MaybeCursor::Null
            } else {
                MaybeCursor::Real(self.backend.cursor(&self.snapshot, strat.index, &prefix)?)
            };
            entries.push((pattern_idx, cursor));
        }
        Ok(LevelState { entries, current: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triejoin_shared::index::InMemoryBackend;
    use triejoin_shared::term::{PatternSlot as S, Term};
    use triejoin_shared::triple::Triple;

    fn load(triples: &[(&str, &str, &str)]) -> (Dictionary, InMemoryBackend) {
        let mut dict = Dictionary::new();
        let mut backend = InMemoryBackend::new();
        for &(s, p, o) in triples {
            let sc = dict.insert(Term::iri(s));
            let pc = dict.insert(Term::iri(p));
            let oc = dict.insert(Term::iri(o));
            backend.insert(Triple::new(sc, pc, oc));
        }
        (dict, backend)
    }

    fn iri(s: &str) -> S {
        S::Constant(Term::iri(s))
    }

    fn drive(patterns: Vec<TriplePattern>, dict: &Dictionary, backend: &InMemoryBackend) -> Vec<Vec<Code>> {
        let plan = planner::compute_plan(&patterns, None).unwrap();
        let mut driver = JoinDriver::new(plan, patterns, dict, backend, CancellationToken::new());
        let mut rows = Vec::new();
        while let Some(row) = driver.next().unwrap() {
            rows.push(row);
        }
        rows
    }

    /// S5 — leapfrog intersection over a shared subject yields exactly the
    /// matching set, each tuple once, regardless of insertion order.
    #[test]
    fn star_join_intersects_shared_subject() {
        let (dict, backend) = load(&[
            ("alice", "knows", "bob"),
            ("alice", "age", "30"),
            ("bob", "knows", "carol"),
            ("bob", "age", "25"),
        ]);
        let patterns = vec![
            TriplePattern::new(S::var("x"), iri("knows"), S::var("y")),
            TriplePattern::new(S::var("x"), iri("age"), S::var("age")),
        ];
        let rows = drive(patterns, &dict, &backend);
        assert_eq!(rows.len(), 2);
        let mut xs: Vec<Code> = rows.iter().map(|r| r[0]).collect();
        xs.sort();
        let mut expected: Vec<Code> = vec![dict.encode(&Term::iri("alice")).unwrap(), dict.encode(&Term::iri("bob")).unwrap()];
        expected.sort();
        assert_eq!(xs, expected);
    }

    #[test]
    fn no_intersection_yields_no_rows() {
        let (dict, backend) = load(&[("alice", "knows", "bob"), ("carol", "age", "25")]);
        let patterns = vec![
            TriplePattern::new(S::var("x"), iri("knows"), S::var("y")),
            TriplePattern::new(S::var("x"), iri("age"), S::var("z")),
        ];
        let rows = drive(patterns, &dict, &backend);
        assert!(rows.is_empty());
    }

    /// S6 — a constant absent from the dictionary makes its pattern an
    /// empty join, not an error.
    #[test]
    fn dictionary_miss_yields_empty_result_not_error() {
        let (dict, backend) = load(&[("alice", "knows", "bob")]);
        let patterns = vec![TriplePattern::new(S::var("x"), iri("never_seen"), S::var("y"))];
        let rows = drive(patterns, &dict, &backend);
        assert!(rows.is_empty());
    }

    #[test]
    fn ground_pattern_with_no_variables_yields_single_empty_tuple() {
        let (dict, backend) = load(&[("alice", "knows", "bob")]);
        let patterns = vec![TriplePattern::new(iri("alice"), iri("knows"), iri("bob"))];
        let rows = drive(patterns, &dict, &backend);
        assert_eq!(rows, vec![Vec::<Code>::new()]);
    }

    #[test]
    fn ground_pattern_that_does_not_exist_yields_no_tuple() {
        let (dict, backend) = load(&[("alice", "knows", "bob")]);
        let patterns = vec![TriplePattern::new(iri("alice"), iri("knows"), iri("mallory"))];
        let rows = drive(patterns, &dict, &backend);
        assert!(rows.is_empty());
    }

    #[test]
    fn cancellation_is_observed_before_first_tuple() {
        let (dict, backend) = load(&[("alice", "knows", "bob")]);
        let patterns = vec![TriplePattern::new(S::var("x"), iri("knows"), S::var("y"))];
        let plan = planner::compute_plan(&patterns, None).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut driver = JoinDriver::new(plan, patterns, &dict, &backend, cancel);
        assert!(matches!(driver.next(), Err(QueryError::Cancelled)));
    }

    #[test]
    fn chain_join_produces_consistent_bindings() {
        let (dict, backend) = load(&[
            ("alice", "knows", "bob"),
            ("bob", "knows", "carol"),
            ("carol", "knows", "dave"),
            ("dave", "knows", "alice"),
        ]);
        let patterns = vec![
            TriplePattern::new(S::var("a"), iri("knows"), S::var("b")),
            TriplePattern::new(S::var("b"), iri("knows"), S::var("c")),
        ];
        let plan = planner::compute_plan(&patterns, None).unwrap();
        let order = plan.order.clone();
        let mut driver = JoinDriver::new(plan, patterns, &dict, &backend, CancellationToken::new());
        let mut rows = Vec::new();
        while let Some(row) = driver.next().unwrap() {
            rows.push(row);
        }
        assert_eq!(rows.len(), 4);
        let b_idx = order.iter().position(|v| v == "b").unwrap();
        for row in &rows {
            assert!(dict.decode(row[b_idx]).is_some());
        }
    }
}
