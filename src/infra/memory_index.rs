// In-process SearchIndex used by the unit tests. Pages are cut
// from an eagerly evaluated result list; cursors are plain ids.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::domain::document::{DocRef, Document, PubmedRecord};
use crate::domain::query::{MinimumShouldMatch, Query};
use crate::domain::traits::{
    IndexAdmin, IndexDeletion, SearchError, SearchHit, SearchIndex, SearchPage, WriteOutcome,
};

pub const INDEX_NAME: &str = "memory_index";

struct Cursor {
    total:     u64,
    page_size: usize,
    queue:     VecDeque<SearchHit>,
}

#[derive(Default)]
pub struct MemoryIndex {
    records:  RefCell<Vec<PubmedRecord>>,
    cursors:  RefCell<HashMap<String, Cursor>>,
    page_cap: Option<usize>,
    pub cleared:  RefCell<Vec<String>>,
    pub requests: RefCell<usize>,
    exists:   RefCell<bool>,
}

impl MemoryIndex {
    pub fn new(documents: Vec<Document>) -> Self {
        let records = documents.into_iter().map(to_record).collect();
        Self { records: RefCell::new(records), exists: RefCell::new(true), ..Self::default() }
    }

    /// Caps the page size regardless of what the caller asks for
    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_cap = Some(cap);
        self
    }

    pub fn push_record(&self, record: PubmedRecord) {
        self.records.borrow_mut().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    fn id_of(pos: usize) -> String {
        format!("doc-{pos}")
    }

    fn words(text: &str) -> BTreeSet<String> {
        text.split_whitespace().map(|w| w.to_lowercase()).collect()
    }

    fn text_words(r: &PubmedRecord) -> BTreeSet<String> {
        let mut w = Self::words(r.title.as_deref().unwrap_or(""));
        w.extend(Self::words(r.abstract_text.as_deref().unwrap_or("")));
        w
    }

    fn mesh_of(r: &PubmedRecord) -> BTreeSet<String> {
        r.mesh_set.clone().map(|m| m.into_set()).unwrap_or_default()
    }

    /// (position, score) of every match, in index order
    fn evaluate(&self, query: &Query) -> Vec<(usize, Option<f64>)> {
        let records = self.records.borrow();
        match query {
            Query::Exact { value, .. } => records.iter().enumerate()
                .filter(|(_, r)| r.pmid.as_deref() == Some(value.as_str()))
                .map(|(i, _)| (i, None))
                .collect(),
            Query::Conjunction { terms, .. } => records.iter().enumerate()
                .filter(|(_, r)| {
                    let mesh = Self::mesh_of(r);
                    terms.iter().all(|t| mesh.contains(t))
                })
                .map(|(i, _)| (i, None))
                .collect(),
            Query::Similarity { like, minimum_should_match, .. } => {
                let seed_ids: BTreeSet<&str> = like.iter().map(|r| r.id.as_str()).collect();
                let seeds: Vec<BTreeSet<String>> = records.iter().enumerate()
                    .filter(|(i, _)| seed_ids.contains(Self::id_of(*i).as_str()))
                    .map(|(_, r)| Self::text_words(r))
                    .collect();

                records.iter().enumerate()
                    .filter(|(i, _)| !seed_ids.contains(Self::id_of(*i).as_str()))
                    .filter_map(|(i, r)| {
                        let words = Self::text_words(r);
                        seeds.iter()
                            .filter_map(|seed| {
                                let shared = seed.intersection(&words).count();
                                let needed = match minimum_should_match {
                                    MinimumShouldMatch::Count(n)   => *n as usize,
                                    MinimumShouldMatch::Percent(p) => (seed.len() * *p as usize).div_ceil(100),
                                };
                                (shared > 0 && shared >= needed).then_some(shared)
                            })
                            .max()
                            .map(|best| (i, Some(best as f64)))
                    })
                    .collect()
            }
        }
    }

    fn page(&self, cursor: &str) -> Result<SearchPage, SearchError> {
        let mut cursors = self.cursors.borrow_mut();
        let state = cursors.get_mut(cursor).ok_or_else(|| SearchError::Status {
            status: 404,
            body:   format!("no cursor {cursor}"),
        })?;
        let take = state.page_size.min(state.queue.len());
        Ok(SearchPage {
            cursor:     Some(cursor.to_string()),
            total_hits: state.total,
            hits:       state.queue.drain(..take).collect(),
        })
    }
}

fn to_record(d: Document) -> PubmedRecord {
    PubmedRecord {
        mesh_set:      Some(crate::domain::document::MeshField::Joined(d.mesh_string())),
        pmid:          Some(d.pmid),
        title:         Some(d.title),
        abstract_text: Some(d.abstract_text),
    }
}

impl SearchIndex for MemoryIndex {
    fn search(&self, query: &Query, page_size: usize) -> Result<SearchPage, SearchError> {
        *self.requests.borrow_mut() += 1;
        let page_size = self.page_cap.map_or(page_size, |cap| cap.min(page_size));
        let records   = self.records.borrow();
        let hits: VecDeque<SearchHit> = self.evaluate(query)
            .into_iter()
            .map(|(i, score)| SearchHit {
                reference: DocRef::new(INDEX_NAME, Self::id_of(i)),
                score,
                source:    records[i].clone(),
            })
            .collect();
        drop(records);

        let cursor = format!("cursor-{}", self.cursors.borrow().len());
        let state  = Cursor { total: hits.len() as u64, page_size, queue: hits };
        self.cursors.borrow_mut().insert(cursor.clone(), state);
        self.page(&cursor)
    }

    fn next_page(&self, cursor: &str) -> Result<SearchPage, SearchError> {
        *self.requests.borrow_mut() += 1;
        self.page(cursor)
    }

    fn clear_cursor(&self, cursor: &str) -> Result<(), SearchError> {
        self.cleared.borrow_mut().push(cursor.to_string());
        Ok(())
    }
}

impl IndexAdmin for MemoryIndex {
    fn delete_index(&self) -> Result<IndexDeletion, SearchError> {
        let existed = self.exists.replace(false);
        self.records.borrow_mut().clear();
        Ok(if existed { IndexDeletion::Deleted } else { IndexDeletion::Missing })
    }

    fn create_index(&self) -> Result<(), SearchError> {
        self.exists.replace(true);
        Ok(())
    }

    fn index_document(&self, document: &Document) -> Result<WriteOutcome, SearchError> {
        self.records.borrow_mut().push(to_record(document.clone()));
        Ok(WriteOutcome { shards_total: 1, shards_failed: 0 })
    }

    fn refresh(&self) -> Result<(), SearchError> {
        Ok(())
    }
}
