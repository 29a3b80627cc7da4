/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The variable ordering planner (spec.md §4.1). Given a conjunction of
//! triple patterns and optional statistics, produces a total order over the
//! free variables and, per (variable, pattern) pair, the index permutation
//! and prefix variables the trie-join uses when that variable becomes the
//! current join target.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};
use serde::Serialize;
use triejoin_shared::stats::{Statistics, DEFAULT_CARDINALITY};
use triejoin_shared::term::{Position as TermPosition, Term, TriplePattern};
use triejoin_shared::index::Permutation;

use crate::error::QueryError;

/// Planner scoring weights (spec.md §4.1.1). Grouped the way the teacher
/// engine groups cost-model constants: a bag of named constants next to the
/// code that reads them, not a config file.
pub struct ScoreConstants;

impl ScoreConstants {
    pub const BASE: f64 = 1.0;
    pub const SHARED_VAR_BONUS: f64 = 1.0;
    pub const CONSTANTS_BONUS: f64 = 0.5;
    pub const PREDICATE_POSITION_BONUS: f64 = 0.3;
    pub const STAT_BONUS_WEIGHT: f64 = 0.4;
}

/// (pattern index, variable) access strategy: which index permutation to
/// scan and which already-bound variables form its prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessStrategy {
    pub index: Permutation,
    pub prefix_vars: Vec<String>,
}

/// Per-variable planning info surfaced for explainability
/// (`compute_with_info`, spec.md §6).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableInfo {
    pub name: String,
    pub patterns: Vec<usize>,
    pub positions: HashSet<TermPosition>,
    pub selectivity: f64,
    pub available_indices: Vec<Permutation>,
}

/// An ordered variable list plus the per-(pattern, variable) access
/// strategy (spec.md §3 "Plan").
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub order: Vec<String>,
    strategies: HashMap<(usize, String), AccessStrategy>,
}

impl Plan {
    pub fn strategy_for(&self, pattern_index: usize, var: &str) -> Option<&AccessStrategy> {
        self.strategies.get(&(pattern_index, var.to_string()))
    }
}

fn validate_patterns(patterns: &[TriplePattern]) -> Result<(), QueryError> {
    for p in patterns {
        for slot in [&p.subject, &p.predicate, &p.object] {
            if let Some(Term::Literal { datatype: Some(_), lang: Some(_), .. }) = slot.as_constant() {
                return Err(QueryError::InvalidPattern {
                    detail: "literal carries both a datatype and a language tag".to_string(),
                });
            }
            if let Some(v) = slot.as_variable() {
                if v.name().is_empty() {
                    return Err(QueryError::InvalidPattern { detail: "variable name is empty".to_string() });
                }
            }
        }
    }
    Ok(())
}

fn first_appearance_order(patterns: &[TriplePattern]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for p in patterns {
        for v in p.variables() {
            if seen.insert(v.name().to_string()) {
                order.push(v.name().to_string());
            }
        }
    }
    order
}

fn patterns_containing<'a>(var: &str, patterns: &'a [TriplePattern]) -> Vec<(usize, &'a TriplePattern)> {
    patterns
        .iter()
        .enumerate()
        .filter(|(_, p)| p.variables().any(|v| v.name() == var))
        .collect()
}

pub(crate) fn position_of(var: &str, p: &TriplePattern) -> Option<TermPosition> {
    for (pos, slot) in [
        (TermPosition::Subject, &p.subject),
        (TermPosition::Predicate, &p.predicate),
        (TermPosition::Object, &p.object),
    ] {
        if slot.as_variable().map(|v| v.name()) == Some(var) {
            return Some(pos);
        }
    }
    None
}

/// spec.md §4.1.1 `score`. Lower is more selective.
pub fn score(var: &str, patterns: &[TriplePattern], stats: Option<&Statistics>) -> f64 {
    let containing = patterns_containing(var, patterns);
    let occurrences = containing.len() as f64;
    let constants_in_patterns: f64 = containing.iter().map(|(_, p)| p.constant_count() as f64).sum();
    let ever_predicate = containing.iter().any(|(_, p)| position_of(var, p) == Some(TermPosition::Predicate));

    let mut min_count: Option<u64> = None;
    if let Some(stats) = stats {
        for (_, p) in &containing {
            if let Some(Term::Iri(iri)) = p.predicate.as_constant() {
                if let Some(count) = stats.predicate_count(iri) {
                    min_count = Some(min_count.map_or(count, |m: u64| m.min(count)));
                }
            }
        }
    }
    let stat_bonus = match min_count {
        Some(m) => {
            let m = m.max(1);
            (1.0 + DEFAULT_CARDINALITY as f64 / m as f64).log10().max(0.0) * ScoreConstants::STAT_BONUS_WEIGHT
        }
        None => 0.0,
    };

    let s = ScoreConstants::BASE
        - ScoreConstants::SHARED_VAR_BONUS * (occurrences - 1.0)
        - ScoreConstants::CONSTANTS_BONUS * constants_in_patterns
        - if ever_predicate { ScoreConstants::PREDICATE_POSITION_BONUS } else { 0.0 }
        - stat_bonus;

    trace!(
        "score(?{var}) = {s:.3} (occurrences={occurrences}, constants={constants_in_patterns}, predicate={ever_predicate}, stat_bonus={stat_bonus:.3})"
    );
    s
}

/// spec.md §6 `estimate_selectivity`.
pub fn estimate_selectivity(var: &str, patterns: &[TriplePattern], stats: Option<&Statistics>) -> f64 {
    if patterns_containing(var, patterns).is_empty() {
        return ScoreConstants::BASE;
    }
    score(var, patterns, stats)
}

/// spec.md §4.1.2 `best_index_for`. `bound` is the set of variables already
/// resolved by earlier levels; pattern constants are implicitly bound.
pub fn best_index_for(
    var: &str,
    pattern: &TriplePattern,
    bound: &HashSet<String>,
) -> Result<(Permutation, Vec<String>), QueryError> {
    let target_pos = position_of(var, pattern).ok_or_else(|| QueryError::PlanInfeasible {
        variable: var.to_string(),
        pattern_index: usize::MAX,
    })?;

    let is_bound_slot = |pos: TermPosition| -> Option<Option<String>> {
        let slot = pattern.slot(pos);
        match slot {
            _ if slot.as_constant().is_some() => Some(None),
            _ => slot.as_variable().and_then(|v| {
                if v.name() == var {
                    None // v's own slot can't be part of its own prefix
                } else if bound.contains(v.name()) {
                    Some(Some(v.name().to_string()))
                } else {
                    None
                }
            }),
        }
    };

    // Ranked on the *full* prefix length (constants and bound variables
    // both count) — a permutation that seeks past two bound constants is
    // strictly more useful than one with an empty, vacuously-valid prefix,
    // even though the latter contributes no names to `prefix_vars`.
    let mut best: Option<(Permutation, usize, Vec<String>)> = None;
    for &perm in &Permutation::PREFERENCE_ORDER {
        let slots = perm.slots();
        let target_idx = perm.index_of(target_pos);
        let mut prefix_vars = Vec::with_capacity(target_idx);
        let mut valid = true;
        for &pos in &slots[..target_idx] {
            match is_bound_slot(pos) {
                Some(Some(name)) => prefix_vars.push(name),
                Some(None) => {}
                None => {
                    valid = false;
                    break;
                }
            }
        }
        if !valid {
            continue;
        }
        let better = match &best {
            None => true,
            Some((_, best_len, _)) => target_idx > *best_len,
        };
        if better {
            best = Some((perm, target_idx, prefix_vars));
        }
    }

    best.map(|(perm, _, prefix_vars)| (perm, prefix_vars))
        .ok_or(QueryError::PlanInfeasible { variable: var.to_string(), pattern_index: usize::MAX })
}

/// spec.md §4.1.3 `available_indices`: permutations reachable using only
/// the pattern's own constants, independent of which variables are bound.
pub fn available_indices(var: &str, patterns: &[TriplePattern]) -> Vec<Permutation> {
    let mut out = Vec::new();
    for (_, p) in patterns_containing(var, patterns) {
        if let Some(target_pos) = position_of(var, p) {
            for &perm in &Permutation::PREFERENCE_ORDER {
                let slots = perm.slots();
                let target_idx = perm.index_of(target_pos);
                let all_constant = slots[..target_idx].iter().all(|&pos| p.slot(pos).as_constant().is_some());
                if all_constant && !out.contains(&perm) {
                    out.push(perm);
                }
            }
        }
    }
    out
}

/// spec.md §6 `compute`.
pub fn compute(patterns: &[TriplePattern], stats: Option<&Statistics>) -> Result<Vec<String>, QueryError> {
    validate_patterns(patterns)?;
    let mut order = first_appearance_order(patterns);
    order.sort_by(|a, b| {
        score(a, patterns, stats)
            .partial_cmp(&score(b, patterns, stats))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    debug!("planner order: {:?}", order);
    Ok(order)
}

fn build_strategies(
    order: &[String],
    patterns: &[TriplePattern],
) -> Result<HashMap<(usize, String), AccessStrategy>, QueryError> {
    let mut strategies = HashMap::new();
    let mut bound: HashSet<String> = HashSet::new();
    for var in order {
        for (pattern_idx, pattern) in patterns_containing(var, patterns) {
            let (index, prefix_vars) = best_index_for(var, pattern, &bound).map_err(|e| match e {
                QueryError::PlanInfeasible { variable, .. } => {
                    QueryError::PlanInfeasible { variable, pattern_index: pattern_idx }
                }
                other => other,
            })?;
            strategies.insert((pattern_idx, var.clone()), AccessStrategy { index, prefix_vars });
        }
        bound.insert(var.clone());
    }
    Ok(strategies)
}

/// spec.md §6 `compute` as a full `Plan` (order + strategies), used
/// directly by the trie-join driver.
pub fn compute_plan(patterns: &[TriplePattern], stats: Option<&Statistics>) -> Result<Plan, QueryError> {
    let order = compute(patterns, stats)?;
    let strategies = build_strategies(&order, patterns)?;
    Ok(Plan { order, strategies })
}

/// spec.md §6 `compute_with_info`.
pub fn compute_with_info(
    patterns: &[TriplePattern],
    stats: Option<&Statistics>,
) -> Result<(Plan, HashMap<String, VariableInfo>), QueryError> {
    let plan = compute_plan(patterns, stats)?;
    let mut info = HashMap::new();
    for var in &plan.order {
        let containing = patterns_containing(var, patterns);
        let pattern_indices: Vec<usize> = containing.iter().map(|(i, _)| *i).collect();
        let positions: HashSet<TermPosition> =
            containing.iter().filter_map(|(_, p)| position_of(var, p)).collect();
        info.insert(
            var.clone(),
            VariableInfo {
                name: var.clone(),
                patterns: pattern_indices,
                positions,
                selectivity: score(var, patterns, stats),
                available_indices: available_indices(var, patterns),
            },
        );
    }
    Ok((plan, info))
}

/// Render a `compute_with_info` result as JSON for an `EXPLAIN`-style
/// surface, in plan order rather than the info map's hash order.
pub fn explain_json(plan: &Plan, info: &HashMap<String, VariableInfo>) -> serde_json::Value {
    let variables: Vec<&VariableInfo> = plan.order.iter().filter_map(|v| info.get(v)).collect();
    serde_json::json!({
        "order": plan.order,
        "variables": variables,
    })
}
