// ============================================================
// Layer 4 - Scroll Retrieval
// ============================================================
// Retrieves EVERY document matching a query through the
// engine's cursor API:
//
//   search(query, page_size) -> cursor, total hits, page 1
//   next_page(cursor)        -> page 2, 3, ... until empty
//
// `Scroll` is a lazy, finite, non-restartable iterator: the
// cursor is stateful on the server, so once a page has been
// consumed it cannot be replayed. Pages arrive strictly one
// after another and documents come out in arrival order.
//
// Hits missing a title, abstract or MeSH set are skipped (a
// data-quality issue, not an error) and counted. Each kept
// document carries its compact reference (index + id), its
// score and its rank among the kept documents, so callers can
// reuse it as a similarity seed without re-sending bodies.
//
// Reference: Rust Book §13 (Iterators)

use std::iter::FusedIterator;

use crate::domain::document::RetrievedDocument;
use crate::domain::query::Query;
use crate::domain::traits::{SearchError, SearchHit, SearchIndex};

/// Page size of the initial search and every following page
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

pub struct Scroll<'a, S: SearchIndex + ?Sized> {
    index:      &'a S,
    cursor:     Option<String>,
    total_hits: u64,
    page:       std::vec::IntoIter<SearchHit>,
    kept:       usize,
    skipped:    usize,
    done:       bool,
}

impl<'a, S: SearchIndex + ?Sized> Scroll<'a, S> {
    /// Issue the initial search. The first page is fetched eagerly
    /// so the total hit count is known before iteration starts.
    pub fn open(index: &'a S, query: &Query, page_size: usize) -> Result<Self, SearchError> {
        let first = index.search(query, page_size.max(1))?;
        tracing::debug!("Scroll opened: {} total hits", first.total_hits);

        let mut scroll = Self {
            index,
            cursor:     first.cursor,
            total_hits: first.total_hits,
            page:       Vec::new().into_iter(),
            kept:       0,
            skipped:    0,
            done:       false,
        };
        if first.hits.is_empty() {
            scroll.finish();
        } else {
            scroll.page = first.hits.into_iter();
        }
        Ok(scroll)
    }

    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// Hits dropped so far for missing fields
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Release the server-side cursor. Failing to release it only
    /// wastes server memory until the scroll lifetime expires.
    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;

        if let Some(cursor) = self.cursor.take() {
            if let Err(e) = self.index.clear_cursor(&cursor) {
                tracing::warn!("Could not release scroll cursor: {e}");
            }
        }
        if self.skipped > 0 {
            tracing::warn!(
                "Skipped {} of {} hits with a missing title, abstract or MeSH set",
                self.skipped,
                self.total_hits
            );
        }
        tracing::debug!("Scroll finished: {} documents kept", self.kept);
    }
}

impl<S: SearchIndex + ?Sized> Iterator for Scroll<'_, S> {
    type Item = Result<RetrievedDocument, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            // ── Drain the current page ────────────────────────────────────────
            if let Some(hit) = self.page.next() {
                match hit.source.into_document() {
                    Some(document) => {
                        let rank = self.kept;
                        self.kept += 1;
                        return Some(Ok(RetrievedDocument {
                            document,
                            reference: hit.reference,
                            score:     hit.score,
                            rank,
                        }));
                    }
                    None => {
                        self.skipped += 1;
                        continue;
                    }
                }
            }

            // ── Page exhausted: fetch the next one ────────────────────────────
            let Some(cursor) = self.cursor.clone() else {
                self.finish();
                return None;
            };
            match self.index.next_page(&cursor) {
                Ok(page) => {
                    // Some engines hand out a fresh cursor id per page
                    if let Some(next) = page.cursor {
                        self.cursor = Some(next);
                    }
                    if page.hits.is_empty() {
                        self.finish();
                        return None;
                    }
                    tracing::debug!("Fetched scroll page of {} hits", page.hits.len());
                    self.page = page.hits.into_iter();
                }
                Err(e) => {
                    // The cursor may be dead; never retry a stateful scroll
                    self.finish();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<S: SearchIndex + ?Sized> FusedIterator for Scroll<'_, S> {}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::document::{Document, MeshField, PubmedRecord};
    use crate::domain::query::Conjunction;
    use crate::infra::memory_index::MemoryIndex;

    fn corpus(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(i.to_string(), format!("title {i}"), "abstract", ["D1", "D2"]))
            .collect()
    }

    fn topic() -> Query {
        Query::conjunction(&Conjunction::new(["D1"]))
    }

    #[test]
    fn test_retrieves_every_page_in_order() {
        let index = MemoryIndex::new(corpus(25)).with_page_cap(10);
        let docs: Vec<RetrievedDocument> = Scroll::open(&index, &topic(), 10)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(docs.len(), 25);
        let ranks: Vec<usize> = docs.iter().map(|d| d.rank).collect();
        assert_eq!(ranks, (0..25).collect::<Vec<_>>());
        assert_eq!(docs[0].document.pmid, "0");
        assert_eq!(docs[24].document.pmid, "24");

        // 3 full/partial pages + the terminating empty page
        assert_eq!(*index.requests.borrow(), 4);
        assert_eq!(index.cleared.borrow().len(), 1);
    }

    #[test]
    fn test_skips_incomplete_hits_without_repeats() {
        let index = MemoryIndex::new(corpus(12)).with_page_cap(5);
        for pmid in ["x1", "x2", "x3"] {
            index.push_record(PubmedRecord {
                pmid:          Some(pmid.to_string()),
                title:         None,
                abstract_text: Some("a".to_string()),
                mesh_set:      Some(MeshField::Joined("D1".to_string())),
            });
        }

        let mut scroll = Scroll::open(&index, &topic(), 5).unwrap();
        assert_eq!(scroll.total_hits(), 15);

        let docs: Vec<RetrievedDocument> = scroll.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(docs.len() as u64, scroll.total_hits() - 3);
        assert_eq!(scroll.skipped(), 3);

        let unique: HashSet<&str> = docs.iter().map(|d| d.document.pmid.as_str()).collect();
        assert_eq!(unique.len(), docs.len());
    }

    #[test]
    fn test_empty_result_needs_a_single_request() {
        let index = MemoryIndex::new(corpus(3));
        let query = Query::conjunction(&Conjunction::new(["D999"]));
        let mut scroll = Scroll::open(&index, &query, 10).unwrap();

        assert!(scroll.next().is_none());
        assert!(scroll.next().is_none());
        assert_eq!(*index.requests.borrow(), 1);
    }
}
