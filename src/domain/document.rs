// ============================================================
// Layer 3 - Document Domain Types
// ============================================================
// A PubMed article as stored in the search index, plus the
// labels a PU task attaches to it.
//
// Two labels travel with every labeled document:
//   label      - the NOISY label: how the document was obtained
//                (labeled-positive sample vs. mined unlabeled pool)
//   label_true - the GROUND TRUTH: whether the document's MeSH
//                set contains the whole topic conjunction
//
// Training only ever looks at `label`. Evaluation and corpus
// statistics only ever look at `label_true`.
//
// Reference: Rust Book §5 (Structs), serde field attributes

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::query::Conjunction;

// ─── Document ─────────────────────────────────────────────────────────────────
/// A PubMed article. `pmid` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub pmid: String,

    pub title: String,

    /// `abstract` is a reserved word in Rust, the JSON field keeps its name
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// MeSH descriptor ids. Persisted as one space-joined string.
    #[serde(with = "mesh_set_format")]
    pub mesh_set: BTreeSet<String>,
}

impl Document {
    pub fn new<I, S>(
        pmid:          impl Into<String>,
        title:         impl Into<String>,
        abstract_text: impl Into<String>,
        mesh_set:      I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pmid:          pmid.into(),
            title:         title.into(),
            abstract_text: abstract_text.into(),
            mesh_set:      mesh_set.into_iter().map(Into::into).collect(),
        }
    }

    /// True when every term of the conjunction is one of this document's MeSH ids
    pub fn admits(&self, conjunction: &Conjunction) -> bool {
        conjunction.is_subset_of(&self.mesh_set)
    }

    /// The MeSH set in its persisted (space-joined) form
    pub fn mesh_string(&self) -> String {
        join_mesh(&self.mesh_set)
    }
}

// ─── DocRef ───────────────────────────────────────────────────────────────────
/// Compact reference to an indexed document. Used as a
/// more-like-this seed so full bodies are never sent back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocRef {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_id")]
    pub id: String,
}

impl DocRef {
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self { index: index.into(), id: id.into() }
    }
}

// ─── PubmedRecord ─────────────────────────────────────────────────────────────
/// A document as it arrives from the index (`_source`) or from a
/// dump file, before validation. Any field may be missing or null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PubmedRecord {
    #[serde(default)]
    pub pmid: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,

    #[serde(default)]
    pub mesh_set: Option<MeshField>,
}

impl PubmedRecord {
    /// Validate into a Document. Returns None when the record is
    /// missing its pmid, title, abstract or MeSH set.
    pub fn into_document(self) -> Option<Document> {
        let mesh_set = self.mesh_set?.into_set();
        if mesh_set.is_empty() {
            return None;
        }
        Some(Document {
            pmid:          self.pmid?,
            title:         self.title?,
            abstract_text: self.abstract_text?,
            mesh_set,
        })
    }
}

/// MeSH ids are a space-joined string inside the index but a
/// plain list in most dump formats. Both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeshField {
    Joined(String),
    List(Vec<String>),
}

impl MeshField {
    pub fn into_set(self) -> BTreeSet<String> {
        match self {
            MeshField::Joined(s) => s.split_whitespace().map(str::to_string).collect(),
            MeshField::List(v)   => v.into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

fn join_mesh(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// serde adapter: `BTreeSet<String>` <-> `"D000001 D000002"`
mod mesh_set_format {
    use super::*;

    pub fn serialize<S: Serializer>(set: &BTreeSet<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&join_mesh(set))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<String>, D::Error> {
        Ok(MeshField::deserialize(d)?.into_set())
    }
}

// ─── RetrievedDocument ────────────────────────────────────────────────────────
/// One document produced by a scroll, with the metadata the
/// search engine attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub document:  Document,
    pub reference: DocRef,
    /// Relevance score, absent for unscored (filter-like) queries
    pub score:     Option<f64>,
    /// Position among the documents kept by this scroll
    pub rank:      usize,
}

// ─── PuLabel ──────────────────────────────────────────────────────────────────
/// The two label values of a PU task. The same pair of strings is
/// used for the noisy `label` and the ground-truth `label_true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PuLabel {
    #[serde(rename = "positive/labeled")]
    Positive,

    #[serde(rename = "negative/unlabeled")]
    Negative,
}

impl PuLabel {
    pub const POSITIVE_STR: &'static str = "positive/labeled";
    pub const NEGATIVE_STR: &'static str = "negative/unlabeled";

    pub fn as_str(self) -> &'static str {
        match self {
            PuLabel::Positive => Self::POSITIVE_STR,
            PuLabel::Negative => Self::NEGATIVE_STR,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            Self::POSITIVE_STR => Some(PuLabel::Positive),
            Self::NEGATIVE_STR => Some(PuLabel::Negative),
            _ => None,
        }
    }

    /// Class index fed to tensors: 1 = positive/labeled, 0 = negative/unlabeled
    pub fn class_index(self) -> i32 {
        match self {
            PuLabel::Positive => 1,
            PuLabel::Negative => 0,
        }
    }

    pub fn is_positive(self) -> bool {
        self == PuLabel::Positive
    }
}

impl fmt::Display for PuLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── LabeledDocument ──────────────────────────────────────────────────────────
/// One line of a persisted split file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledDocument {
    #[serde(flatten)]
    pub document: Document,

    /// Noisy label: which query produced the document
    pub label: PuLabel,

    /// Ground truth: conjunction ⊆ mesh_set
    pub label_true: PuLabel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

impl LabeledDocument {
    /// A member of the labeled-positive sample. It was drawn from the
    /// conjunction query, so its ground truth is positive by construction.
    pub fn labeled_positive(document: Document) -> Self {
        Self {
            document,
            label:      PuLabel::Positive,
            label_true: PuLabel::Positive,
            score:      None,
            rank:       None,
        }
    }

    /// A member of the mined unlabeled pool. Its ground truth is
    /// decided by conjunction membership, never by how it was found.
    pub fn unlabeled(retrieved: RetrievedDocument, conjunction: &Conjunction) -> Self {
        let label_true = if retrieved.document.admits(conjunction) {
            PuLabel::Positive
        } else {
            PuLabel::Negative
        };
        Self {
            document:   retrieved.document,
            label:      PuLabel::Negative,
            label_true,
            score:      retrieved.score,
            rank:       Some(retrieved.rank),
        }
    }

    pub fn pmid(&self) -> &str {
        &self.document.pmid
    }
}
