/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::term::Code;

/// A dictionary-encoded triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: Code,
    pub predicate: Code,
    pub object: Code,
}

impl Triple {
    pub fn new(subject: Code, predicate: Code, object: Code) -> Self {
        Self { subject, predicate, object }
    }
}
