// ============================================================
// Layer 3 - Core Traits (Search Index Protocol)
// ============================================================
// The corpus constructor never talks HTTP. It drives whatever
// implements these traits:
//
//   SearchIndex - read side: open a cursor over a query, pull
//                 pages until an empty one comes back, release
//                 the cursor
//   IndexAdmin  - write side used by the index builder: drop,
//                 create, fill and refresh the index
//
// Implementations:
//   - ElasticClient (infra/elastic.rs) -> a live Elasticsearch node
//   - MemoryIndex   (infra/memory_index.rs, tests only)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use thiserror::Error;

use crate::domain::document::{DocRef, Document, PubmedRecord};
use crate::domain::query::Query;

// ─── SearchError ──────────────────────────────────────────────────────────────
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request never produced a response (connection, timeout, TLS)
    #[error("search transport error: {0}")]
    Transport(String),

    /// The engine answered with a non-success status
    #[error("search engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("cannot decode search response: {0}")]
    Decode(String),
}

// ─── Pages ────────────────────────────────────────────────────────────────────
/// One hit as returned by the engine, not yet validated.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub reference: DocRef,
    pub score:     Option<f64>,
    pub source:    PubmedRecord,
}

/// One page of a cursor-paginated search.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Cursor handle for the next page. Engines may rotate it between pages.
    pub cursor:     Option<String>,
    /// Total number of matches for the query (not just this page)
    pub total_hits: u64,
    pub hits:       Vec<SearchHit>,
}

// ─── SearchIndex ──────────────────────────────────────────────────────────────
pub trait SearchIndex {
    /// Run `query`, open a cursor and return the first page of `page_size` hits.
    fn search(&self, query: &Query, page_size: usize) -> Result<SearchPage, SearchError>;

    /// Fetch the page after the one last returned for this cursor.
    /// An empty page means the result set is exhausted.
    fn next_page(&self, cursor: &str) -> Result<SearchPage, SearchError>;

    /// Release server-side cursor state.
    fn clear_cursor(&self, cursor: &str) -> Result<(), SearchError>;
}

// ─── IndexAdmin ───────────────────────────────────────────────────────────────
/// Result of dropping an index before a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDeletion {
    Deleted,
    /// The index did not exist. Benign for a rebuild.
    Missing,
}

/// Shard bookkeeping reported for a single document write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    pub shards_total:  u64,
    pub shards_failed: u64,
}

impl WriteOutcome {
    pub fn is_partial(&self) -> bool {
        self.shards_failed > 0
    }
}

pub trait IndexAdmin {
    fn delete_index(&self) -> Result<IndexDeletion, SearchError>;

    /// Create the index with the PubMed field mapping.
    fn create_index(&self) -> Result<(), SearchError>;

    fn index_document(&self, document: &Document) -> Result<WriteOutcome, SearchError>;

    /// Make every write so far visible to searches.
    fn refresh(&self) -> Result<(), SearchError>;
}
