/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Statistics shape consumed by the planner (spec.md §6 "Statistics
//! shape"): a mapping whose keys include `(predicate_count, iri) ->
//! integer`. Absent keys mean "no information" — the planner must tolerate
//! that, never treat it as an error.

use std::collections::HashMap;

/// The default cardinality the planner assumes for a predicate it has no
/// statistic for (spec.md §4.1.1 `DEFAULT_CARDINALITY`).
pub const DEFAULT_CARDINALITY: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKey {
    PredicateCount,
}

/// A statistics mapping. Implementers may inline the key discriminator or
/// use separate tables; this is the concrete representation chosen for this
/// workspace (compound-keyed single map).
#[derive(Debug, Default, Clone)]
pub struct Statistics {
    values: HashMap<(StatKey, String), u64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_predicate_count(&mut self, predicate_iri: impl Into<String>, count: u64) {
        self.values.insert((StatKey::PredicateCount, predicate_iri.into()), count);
    }

    pub fn predicate_count(&self, predicate_iri: &str) -> Option<u64> {
        self.values.get(&(StatKey::PredicateCount, predicate_iri.to_string())).copied()
    }
}
