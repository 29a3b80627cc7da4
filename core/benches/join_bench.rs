/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate criterion;
extern crate triejoin_core;
extern crate triejoin_shared;

use criterion::*;
use triejoin_core::evaluate;
use triejoin_shared::dictionary::Dictionary;
use triejoin_shared::index::InMemoryBackend;
use triejoin_shared::term::{PatternSlot as S, Term, TriplePattern};
use triejoin_shared::triple::Triple;

const EMPLOYEE_COUNT: u64 = 20_000;

fn setup_store() -> (Dictionary, InMemoryBackend) {
    let mut dict = Dictionary::new();
    let mut backend = InMemoryBackend::new();
    let works_at = dict.insert(Term::iri("http://xmlns.com/foaf/0.1/workplaceHomepage"));
    let salary = dict.insert(Term::iri("https://data.cityofchicago.org/resource/xzkq-xp2w/annual_salary"));
    let title = dict.insert(Term::iri("http://xmlns.com/foaf/0.1/title"));
    let homepage = dict.insert(Term::iri("http://example.org/acme"));
    let developer = dict.insert(Term::plain_literal("Developer"));

    for i in 0..EMPLOYEE_COUNT {
        let employee = dict.insert(Term::iri(format!("http://example.org/employee{i}")));
        let salary_value = dict.insert(Term::typed_literal(
            (30_000 + i % 100_000).to_string(),
            "http://www.w3.org/2001/XMLSchema#integer",
        ));
        backend.insert(Triple::new(employee, works_at, homepage));
        backend.insert(Triple::new(employee, salary, salary_value));
        if i % 7 == 0 {
            backend.insert(Triple::new(employee, title, developer));
        }
    }
    (dict, backend)
}

fn star_query() -> Vec<TriplePattern> {
    vec![
        TriplePattern::new(
            S::var("employee"),
            S::Constant(Term::iri("http://xmlns.com/foaf/0.1/workplaceHomepage")),
            S::var("workplace_homepage"),
        ),
        TriplePattern::new(
            S::var("employee"),
            S::Constant(Term::iri("https://data.cityofchicago.org/resource/xzkq-xp2w/annual_salary")),
            S::var("salary"),
        ),
    ]
}

fn subquery_with_bound_title() -> Vec<TriplePattern> {
    vec![
        TriplePattern::new(
            S::var("employee"),
            S::Constant(Term::iri("http://xmlns.com/foaf/0.1/title")),
            S::var("title"),
        ),
        TriplePattern::new(
            S::var("employee"),
            S::Constant(Term::iri("http://xmlns.com/foaf/0.1/title")),
            S::Constant(Term::plain_literal("Developer")),
        ),
    ]
}

fn star_join(c: &mut Criterion) {
    let (dict, backend) = setup_store();

    c.bench_function("star join: employee/workplace/salary", |b| {
        b.iter(|| evaluate(star_query(), None, &backend, &dict).unwrap())
    });
}

fn constant_bound_join(c: &mut Criterion) {
    let (dict, backend) = setup_store();

    c.bench_function("constant-bound join: employee/title=Developer", |b| {
        b.iter(|| evaluate(subquery_with_bound_title(), None, &backend, &dict).unwrap())
    });
}

criterion_group!(benches, star_join, constant_bound_join);
criterion_main!(benches);
