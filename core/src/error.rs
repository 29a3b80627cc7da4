/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use triejoin_shared::index::BackendFault;

/// The error kinds the query execution core must distinguish (spec.md §7).
/// `DictionaryMiss` is deliberately absent: a constant with no dictionary
/// code yields an empty join for its pattern, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A slot value was neither a `Variable` nor a recognised `Term` shape.
    /// Surfaced before any cursor is opened.
    InvalidPattern { detail: String },
    /// No access strategy covers some (variable, pattern) pair at the
    /// chosen order. Should not occur if the planner is correct; this is a
    /// defensive check.
    PlanInfeasible { variable: String, pattern_index: usize },
    /// A cursor operation against the backend failed.
    BackendFault { detail: String },
    /// The cancellation token tripped.
    Cancelled,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidPattern { detail } => write!(f, "invalid pattern: {detail}"),
            QueryError::PlanInfeasible { variable, pattern_index } => {
                write!(f, "no access strategy covers variable `{variable}` at pattern #{pattern_index}")
            }
            QueryError::BackendFault { detail } => write!(f, "backend fault: {detail}"),
            QueryError::Cancelled => write!(f, "query cancelled"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<BackendFault> for QueryError {
    fn from(fault: BackendFault) -> Self {
        QueryError::BackendFault { detail: fault.0 }
    }
}
