/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Query execution core: plan a variable order over a basic graph pattern,
//! drive a leapfrog trie-join over a [`Backend`](triejoin_shared::index::Backend)
//! snapshot, and assemble decoded result rows.
//!
//! This crate owns none of the storage or dictionary-loading concerns —
//! those live in `triejoin-shared` as stand-ins for the external systems
//! this core is pinned against. What lives here is purely: given patterns,
//! statistics, a dictionary and a backend, produce the matching bindings.

pub mod cancel;
pub mod error;
pub mod join;
pub mod planner;
pub mod result;

use log::debug;
use triejoin_shared::dictionary::Dictionary;
use triejoin_shared::index::Backend;
use triejoin_shared::stats::Statistics;
use triejoin_shared::term::TriplePattern;

use cancel::CancellationToken;
use error::QueryError;
use join::JoinDriver;
use result::Row;

/// Plan and open a pull-based evaluator for one basic graph pattern over one
/// backend snapshot. Each [`JoinDriver::next`] call advances the search by
/// exactly one result tuple; nothing runs ahead of what is pulled.
pub fn open_query<'b, B: Backend>(
    patterns: Vec<TriplePattern>,
    stats: Option<&Statistics>,
    backend: &'b B,
    dictionary: &'b Dictionary,
    cancel: CancellationToken,
) -> Result<JoinDriver<'b, B>, QueryError> {
    let plan = planner::compute_plan(&patterns, stats)?;
    debug!("opened query over {} pattern(s), order = {:?}", patterns.len(), plan.order);
    Ok(JoinDriver::new(plan, patterns, dictionary, backend, cancel))
}

/// Run a query to completion and collect every decoded row. Convenience
/// wrapper over [`open_query`] + [`JoinDriver::next`] for callers that don't
/// need streaming or mid-query cancellation.
pub fn evaluate<B: Backend>(
    patterns: Vec<TriplePattern>,
    stats: Option<&Statistics>,
    backend: &B,
    dictionary: &Dictionary,
) -> Result<Vec<Row>, QueryError> {
    let plan = planner::compute_plan(&patterns, stats)?;
    let mut driver = JoinDriver::new(plan.clone(), patterns, dictionary, backend, CancellationToken::new());
    let mut rows = Vec::new();
    while let Some(tuple) = driver.next()? {
        rows.push(result::assemble(&plan, dictionary, &tuple));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triejoin_shared::index::InMemoryBackend;
    use triejoin_shared::term::{PatternSlot as S, Term};
    use triejoin_shared::triple::Triple;

    #[test]
    fn evaluate_runs_planner_join_and_assembly_end_to_end() {
        let mut dict = Dictionary::new();
        let mut backend = InMemoryBackend::new();
        let alice = dict.insert(Term::iri("http://example.org/alice"));
        let knows = dict.insert(Term::iri("http://example.org/knows"));
        let bob = dict.insert(Term::iri("http://example.org/bob"));
        backend.insert(Triple::new(alice, knows, bob));

        let patterns = vec![TriplePattern::new(
            S::var("s"),
            S::Constant(Term::iri("http://example.org/knows")),
            S::var("o"),
        )];

        let rows = evaluate(patterns, None, &backend, &dict).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("s"), Some(&Term::iri("http://example.org/alice")));
        assert_eq!(rows[0].get("o"), Some(&Term::iri("http://example.org/bob")));
    }

    #[test]
    fn open_query_supports_cancellation_before_first_pull() {
        let dict = Dictionary::new();
        let backend = InMemoryBackend::new();
        let patterns = vec![TriplePattern::new(
            S::var("s"),
            S::Constant(Term::iri("http://example.org/knows")),
            S::var("o"),
        )];
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut driver = open_query(patterns, None, &backend, &dict, cancel).unwrap();
        assert!(matches!(driver.next(), Err(QueryError::Cancelled)));
    }
}
