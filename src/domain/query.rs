// ============================================================
// Layer 3 - Query Model
// ============================================================
// Backend-agnostic description of the three queries the corpus
// constructor issues. Translating them into a concrete query
// language (Elasticsearch DSL) is the infra layer's job.
//
//   exact        - one field equals one value (pmid lookups)
//   conjunction  - every MeSH id of a topic is present (AND match)
//   similarity   - "more like these seeds" over title + abstract

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::document::DocRef;

pub const MESH_FIELD: &str = "mesh_set";
pub const TEXT_FIELDS: [&str; 2] = ["title", "abstract"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("topic '{0}' contains no MeSH ids")]
    EmptyConjunction(String),

    #[error("invalid minimum_should_match '{0}': expected a percentage like 15% or a term count like 3")]
    InvalidMinimumShouldMatch(String),
}

// ─── Conjunction ──────────────────────────────────────────────────────────────
/// A sorted, de-duplicated set of MeSH ids whose joint presence
/// on a document defines topic membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conjunction(Vec<String>);

impl Conjunction {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = terms.into_iter().map(Into::into).collect();
        Self(set.into_iter().collect())
    }

    /// Parse a period-separated topic such as `D000328.D008875.D015658`
    pub fn parse_topic(topic: &str) -> Result<Self, QueryError> {
        let terms: Vec<&str> = topic
            .trim()
            .split('.')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Err(QueryError::EmptyConjunction(topic.to_string()));
        }
        Ok(Self::new(terms))
    }

    pub fn terms(&self) -> &[String] {
        &self.0
    }

    pub fn is_subset_of(&self, mesh_set: &BTreeSet<String>) -> bool {
        self.0.iter().all(|t| mesh_set.contains(t))
    }

    /// Directory-friendly form: `D000328.D008875`
    pub fn dotted(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" AND "))
    }
}

// ─── MinimumShouldMatch ───────────────────────────────────────────────────────
/// Minimum term overlap a candidate must share with the seeds.
/// Higher values give a smaller, more precise unlabeled pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimumShouldMatch {
    Percent(u8),
    Count(u32),
}

impl FromStr for MinimumShouldMatch {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QueryError::InvalidMinimumShouldMatch(s.to_string());
        let trimmed = s.trim();
        match trimmed.strip_suffix('%') {
            Some(p) => {
                let pct: u8 = p.trim().parse().map_err(|_| invalid())?;
                if pct > 100 {
                    return Err(invalid());
                }
                Ok(MinimumShouldMatch::Percent(pct))
            }
            None => trimmed.parse().map(MinimumShouldMatch::Count).map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for MinimumShouldMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinimumShouldMatch::Percent(p) => write!(f, "{p}%"),
            MinimumShouldMatch::Count(n)   => write!(f, "{n}"),
        }
    }
}

// ─── Query ────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Exact {
        field: String,
        value: String,
    },
    Conjunction {
        field: String,
        terms: Vec<String>,
    },
    Similarity {
        fields:               Vec<String>,
        like:                 Vec<DocRef>,
        minimum_should_match: MinimumShouldMatch,
    },
}

impl Query {
    pub fn exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Exact { field: field.into(), value: value.into() }
    }

    /// Boolean AND match over `mesh_set`: the full positive set P of a topic
    pub fn conjunction(conjunction: &Conjunction) -> Self {
        Query::Conjunction {
            field: MESH_FIELD.to_string(),
            terms: conjunction.terms().to_vec(),
        }
    }

    /// Documents textually similar to any of the seeds, over title and abstract
    pub fn similarity(seeds: &[DocRef], minimum_should_match: MinimumShouldMatch) -> Self {
        Query::Similarity {
            fields: TEXT_FIELDS.iter().map(|f| f.to_string()).collect(),
            like:   seeds.to_vec(),
            minimum_should_match,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topic_sorts_and_dedups() {
        let c = Conjunction::parse_topic("D015658.D000328.D008875.D000328").unwrap();
        assert_eq!(c.terms(), ["D000328", "D008875", "D015658"]);
        assert_eq!(c.dotted(), "D000328.D008875.D015658");
    }

    #[test]
    fn test_parse_topic_rejects_empty() {
        assert!(Conjunction::parse_topic(" . ").is_err());
    }

    #[test]
    fn test_subset() {
        let c = Conjunction::new(["D1", "D2"]);
        let full: BTreeSet<String>    = ["D1", "D2", "D3"].iter().map(|s| s.to_string()).collect();
        let partial: BTreeSet<String> = ["D1", "D3"].iter().map(|s| s.to_string()).collect();
        assert!(c.is_subset_of(&full));
        assert!(!c.is_subset_of(&partial));
    }

    #[test]
    fn test_minimum_should_match_forms() {
        assert_eq!("15%".parse(), Ok(MinimumShouldMatch::Percent(15)));
        assert_eq!("3".parse(),   Ok(MinimumShouldMatch::Count(3)));
        assert!("150%".parse::<MinimumShouldMatch>().is_err());
        assert!("many".parse::<MinimumShouldMatch>().is_err());
        assert_eq!(MinimumShouldMatch::Percent(15).to_string(), "15%");
    }

    #[test]
    fn test_similarity_query_targets_text_fields() {
        let seeds = vec![DocRef::new("idx", "a")];
        match Query::similarity(&seeds, MinimumShouldMatch::Count(2)) {
            Query::Similarity { fields, like, .. } => {
                assert_eq!(fields, ["title", "abstract"]);
                assert_eq!(like, seeds);
            }
            other => panic!("unexpected query {other:?}"),
        }
    }
}
