/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Result assembly (spec.md §4.4): turning one join-driver tuple of codes
//! into a decoded row, keyed by variable name.

use std::collections::HashMap;

use triejoin_shared::dictionary::Dictionary;
use triejoin_shared::term::{Code, Term};

use crate::planner::Plan;

/// One result row: variable name -> decoded term, in no particular column
/// order (the plan's `order` is an internal join detail, not the row shape
/// a caller should depend on).
pub type Row = HashMap<String, Term>;

/// Decode one tuple of codes (in `plan.order` order) into a `Row`.
///
/// Every code reaching this point was read back from a cursor opened
/// against triples the dictionary itself produced codes for, so a decode
/// miss here means the backend and dictionary have gone out of sync, not a
/// caller mistake — it is a bug, not a recoverable condition.
pub fn assemble(plan: &Plan, dictionary: &Dictionary, tuple: &[Code]) -> Row {
    plan.order
        .iter()
        .zip(tuple.iter())
        .map(|(name, &code)| {
            let term = dictionary
                .decode(code)
                .cloned()
                .expect("bound code must be present in the dictionary that produced it");
            (name.clone(), term)
        })
        .collect()
}
