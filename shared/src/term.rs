/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::{Deserialize, Serialize};

/// An RDF term. Literals carry either a datatype IRI or a language tag,
/// never both; the absence of both denotes `xsd:string`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    BNode(String),
    Literal {
        lex: String,
        datatype: Option<String>,
        lang: Option<String>,
    },
}

impl Term {
    pub fn iri(uri: impl Into<String>) -> Self {
        Term::Iri(uri.into())
    }

    pub fn bnode(label: impl Into<String>) -> Self {
        Term::BNode(label.into())
    }

    pub fn plain_literal(lex: impl Into<String>) -> Self {
        Term::Literal { lex: lex.into(), datatype: None, lang: None }
    }

    pub fn typed_literal(lex: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal { lex: lex.into(), datatype: Some(datatype.into()), lang: None }
    }

    pub fn lang_literal(lex: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal { lex: lex.into(), datatype: None, lang: Some(lang.into()) }
    }

    /// `true` when this literal would be encoded with a numeric/temporal kind
    /// tag rather than the generic plain-literal tag (§3 "Encoded term").
    pub fn numeric_or_temporal_datatype(&self) -> Option<TermKind> {
        match self {
            Term::Literal { datatype: Some(dt), .. } => match dt.rsplit(['#', '/']).next()? {
                "integer" | "int" | "long" | "short" | "nonNegativeInteger" => Some(TermKind::Integer),
                "decimal" | "double" | "float" => Some(TermKind::Decimal),
                "dateTime" | "date" => Some(TermKind::DateTime),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A SPARQL variable. Two variables compare equal iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variable(pub String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Variable {
    fn from(s: &str) -> Self {
        Variable(s.to_string())
    }
}

/// One slot of a triple pattern: either bound to a constant term or free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternSlot {
    Variable(Variable),
    Constant(Term),
}

impl PatternSlot {
    pub fn var(name: impl Into<String>) -> Self {
        PatternSlot::Variable(Variable::new(name))
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            PatternSlot::Variable(v) => Some(v),
            PatternSlot::Constant(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Term> {
        match self {
            PatternSlot::Constant(t) => Some(t),
            PatternSlot::Variable(_) => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, PatternSlot::Variable(_))
    }
}

/// A triple pattern: subject, predicate, object, each either a constant or
/// a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: PatternSlot,
    pub predicate: PatternSlot,
    pub object: PatternSlot,
}

impl TriplePattern {
    pub fn new(subject: PatternSlot, predicate: PatternSlot, object: PatternSlot) -> Self {
        Self { subject, predicate, object }
    }

    pub fn slot(&self, pos: Position) -> &PatternSlot {
        match pos {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    /// Every distinct variable in this pattern, in subject/predicate/object order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(|s| s.as_variable())
    }

    /// Number of constant slots in this pattern.
    pub fn constant_count(&self) -> usize {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter(|s| s.as_constant().is_some())
            .count()
    }
}

/// One of the three triple positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Subject,
    Predicate,
    Object,
}

/// The high-bit tag distinguishing encoded-term kinds (§3 "Encoded term").
/// Codes are totally ordered by unsigned integer value, which is exactly
/// the order the six indexes sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u64)]
pub enum TermKind {
    Iri = 0b0001,
    BNode = 0b0010,
    PlainLiteral = 0b0011,
    Integer = 0b0100,
    Decimal = 0b0101,
    DateTime = 0b0110,
}

impl TermKind {
    pub fn of(term: &Term) -> Self {
        match term {
            Term::Iri(_) => TermKind::Iri,
            Term::BNode(_) => TermKind::BNode,
            Term::Literal { .. } => term.numeric_or_temporal_datatype().unwrap_or(TermKind::PlainLiteral),
        }
    }
}

/// A fixed-width integer code: high bits are the `TermKind` tag, low bits
/// address the dictionary entry.
pub type Code = u64;

const TAG_BITS: u32 = 4;
const TAG_SHIFT: u32 = u64::BITS - TAG_BITS;
const ADDR_MASK: u64 = (1u64 << TAG_SHIFT) - 1;

pub fn make_code(kind: TermKind, addr: u64) -> Code {
    debug_assert!(addr <= ADDR_MASK, "dictionary address overflowed the {TAG_BITS}-bit tag budget");
    ((kind as u64) << TAG_SHIFT) | (addr & ADDR_MASK)
}

pub fn code_addr(code: Code) -> u64 {
    code & ADDR_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_order_by_kind_then_address() {
        let iri0 = make_code(TermKind::Iri, 0);
        let iri5 = make_code(TermKind::Iri, 5);
        let bnode0 = make_code(TermKind::BNode, 0);
        assert!(iri0 < iri5);
        assert!(iri5 < bnode0);
    }

    #[test]
    fn addr_roundtrips() {
        let c = make_code(TermKind::Decimal, 1234);
        assert_eq!(code_addr(c), 1234);
    }
}
