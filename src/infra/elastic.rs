// ============================================================
// Layer 6 - Elasticsearch Client
// ============================================================
// Blocking HTTP implementation of SearchIndex and IndexAdmin.
//
// Read side (scroll API):
//   POST   /{index}/_search?scroll=10m&size=N   -> _scroll_id + page 1
//   POST   /_search/scroll {scroll, scroll_id}  -> next page
//   DELETE /_search/scroll {scroll_id}          -> release cursor
//
// Write side:
//   DELETE /{index}        (404 = index did not exist, fine)
//   PUT    /{index}        with the PubMed mapping
//   POST   /{index}/_doc   one document per request
//   POST   /{index}/_refresh
//
// One pooled client is reused for every request. Page fetches
// are strictly sequential: sequential correctness over throughput.
//
// Reference: Elasticsearch scroll / more_like_this / match docs
//            reqwest::blocking documentation

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::document::{DocRef, Document, PubmedRecord};
use crate::domain::query::Query;
use crate::domain::traits::{
    IndexAdmin, IndexDeletion, SearchError, SearchHit, SearchIndex, SearchPage, WriteOutcome,
};

pub const DEFAULT_SCROLL_LIFETIME: &str = "10m";

/// Long timeout: a single scroll page of 10k abstracts is slow to build
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60 * 5);

pub struct ElasticClient {
    http:            Client,
    base_url:        String,
    index:           String,
    scroll_lifetime: String,
}

impl ElasticClient {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Result<Self, SearchError> {
        let http = Client::builder()
            .user_agent(concat!("pubmed-pu/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SearchError::Transport(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url:        base_url.into().trim_end_matches('/').to_string(),
            index:           index.into(),
            scroll_lifetime: DEFAULT_SCROLL_LIFETIME.to_string(),
        })
    }

    pub fn with_scroll_lifetime(mut self, lifetime: impl Into<String>) -> Self {
        self.scroll_lifetime = lifetime.into();
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and return the decoded JSON body of a 2xx response.
    fn send(&self, request: RequestBuilder) -> Result<Value, SearchError> {
        let response = request
            .send()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        let status = response.status();
        let body   = response
            .text()
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(SearchError::Status { status: status.as_u16(), body });
        }
        serde_json::from_str(&body).map_err(|e| SearchError::Decode(e.to_string()))
    }
}

// ─── Query DSL ────────────────────────────────────────────────────────────────
/// Translate a domain query into an Elasticsearch request body.
pub fn query_body(query: &Query) -> Value {
    let inner = match query {
        Query::Exact { field, value } => json!({
            "match": { field.as_str(): value }
        }),
        // MeSH ids must not be stemmed or split, hence the whitespace analyzer
        Query::Conjunction { field, terms } => json!({
            "match": {
                field.as_str(): {
                    "query":    terms.join(" "),
                    "analyzer": "whitespace",
                    "operator": "and"
                }
            }
        }),
        Query::Similarity { fields, like, minimum_should_match } => json!({
            "more_like_this": {
                "fields":               fields,
                "like":                 like,
                "minimum_should_match": minimum_should_match.to_string()
            }
        }),
    };
    json!({ "query": inner })
}

/// Field mapping of the PubMed index. Term vectors speed up
/// more-like-this; titles weigh double.
pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "_source": { "enabled": true },
            "properties": {
                "pmid":     { "type": "keyword" },
                "abstract": { "type": "text", "term_vector": "yes", "analyzer": "english" },
                "title":    { "type": "text", "term_vector": "yes", "analyzer": "english", "boost": 2.0 },
                "mesh_set": { "type": "text", "term_vector": "yes", "analyzer": "whitespace" }
            }
        }
    })
}

// ─── Response decoding ────────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    hits:      RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    total: RawTotal,
    #[serde(default)]
    hits:  Vec<RawHit>,
}

/// 6.x reports a bare number, 7.x+ an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_index")]
    index:  String,
    #[serde(rename = "_id")]
    id:     String,
    #[serde(rename = "_score", default)]
    score:  Option<f64>,
    #[serde(rename = "_source", default)]
    source: PubmedRecord,
}

pub fn parse_page(body: Value) -> Result<SearchPage, SearchError> {
    let raw: RawResponse =
        serde_json::from_value(body).map_err(|e| SearchError::Decode(e.to_string()))?;

    let total_hits = match raw.hits.total {
        RawTotal::Count(n)          => n,
        RawTotal::Object { value }  => value,
    };
    let hits = raw.hits.hits
        .into_iter()
        .map(|h| SearchHit {
            reference: DocRef::new(h.index, h.id),
            score:     h.score,
            source:    h.source,
        })
        .collect();

    Ok(SearchPage { cursor: raw.scroll_id, total_hits, hits })
}

#[derive(Debug, Deserialize)]
struct RawWrite {
    #[serde(rename = "_shards")]
    shards: RawShards,
}

#[derive(Debug, Deserialize)]
struct RawShards {
    #[serde(default)]
    total:  u64,
    #[serde(default)]
    failed: u64,
}

// ─── SearchIndex ──────────────────────────────────────────────────────────────
impl SearchIndex for ElasticClient {
    fn search(&self, query: &Query, page_size: usize) -> Result<SearchPage, SearchError> {
        let url  = self.url(&format!("{}/_search", self.index));
        let body = query_body(query);
        tracing::debug!("Opening scroll on '{}': {}", self.index, body);

        let request = self.http
            .post(url)
            .query(&[
                ("scroll", self.scroll_lifetime.clone()),
                ("size",   page_size.to_string()),
            ])
            .json(&body);
        parse_page(self.send(request)?)
    }

    fn next_page(&self, cursor: &str) -> Result<SearchPage, SearchError> {
        let request = self.http
            .post(self.url("_search/scroll"))
            .json(&json!({ "scroll": self.scroll_lifetime, "scroll_id": cursor }));
        parse_page(self.send(request)?)
    }

    fn clear_cursor(&self, cursor: &str) -> Result<(), SearchError> {
        let request = self.http
            .delete(self.url("_search/scroll"))
            .json(&json!({ "scroll_id": cursor }));
        self.send(request).map(|_| ())
    }
}

// ─── IndexAdmin ───────────────────────────────────────────────────────────────
impl IndexAdmin for ElasticClient {
    fn delete_index(&self) -> Result<IndexDeletion, SearchError> {
        match self.send(self.http.delete(self.url(&self.index))) {
            Ok(_) => Ok(IndexDeletion::Deleted),
            Err(SearchError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(IndexDeletion::Missing)
            }
            Err(e) => Err(e),
        }
    }

    fn create_index(&self) -> Result<(), SearchError> {
        let request = self.http.put(self.url(&self.index)).json(&index_mapping());
        self.send(request).map(|_| ())
    }

    fn index_document(&self, document: &Document) -> Result<WriteOutcome, SearchError> {
        let request = self.http
            .post(self.url(&format!("{}/_doc", self.index)))
            .json(document);
        let raw: RawWrite = serde_json::from_value(self.send(request)?)
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(WriteOutcome { shards_total: raw.shards.total, shards_failed: raw.shards.failed })
    }

    fn refresh(&self) -> Result<(), SearchError> {
        let request = self.http.post(self.url(&format!("{}/_refresh", self.index)));
        self.send(request).map(|_| ())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::{Conjunction, MinimumShouldMatch};

    #[test]
    fn test_conjunction_body() {
        let body = query_body(&Query::conjunction(&Conjunction::new(["D2", "D1"])));
        assert_eq!(
            body,
            json!({ "query": { "match": { "mesh_set": {
                "query": "D1 D2", "analyzer": "whitespace", "operator": "and"
            }}}})
        );
    }

    #[test]
    fn test_exact_body() {
        let body = query_body(&Query::exact("pmid", "30000001"));
        assert_eq!(body, json!({ "query": { "match": { "pmid": "30000001" } } }));
    }

    #[test]
    fn test_similarity_body_uses_compact_refs() {
        let seeds = vec![DocRef::new("pubmed_index", "abc")];
        let body  = query_body(&Query::similarity(&seeds, MinimumShouldMatch::Percent(15)));
        let mlt   = &body["query"]["more_like_this"];
        assert_eq!(mlt["fields"], json!(["title", "abstract"]));
        assert_eq!(mlt["like"], json!([{ "_index": "pubmed_index", "_id": "abc" }]));
        assert_eq!(mlt["minimum_should_match"], "15%");
    }

    #[test]
    fn test_parse_page_accepts_both_total_formats() {
        let hit = json!({
            "_index": "pubmed_index", "_id": "1", "_score": 2.5,
            "_source": { "pmid": "11", "title": "t", "abstract": "a", "mesh_set": "D1 D2" }
        });

        let v6 = parse_page(json!({ "_scroll_id": "c1", "hits": { "total": 7, "hits": [hit.clone()] } })).unwrap();
        assert_eq!(v6.total_hits, 7);
        assert_eq!(v6.cursor.as_deref(), Some("c1"));

        let v7 = parse_page(json!({
            "_scroll_id": "c2",
            "hits": { "total": { "value": 9, "relation": "eq" }, "hits": [hit] }
        })).unwrap();
        assert_eq!(v7.total_hits, 9);
        assert_eq!(v7.hits[0].score, Some(2.5));
        assert_eq!(v7.hits[0].reference, DocRef::new("pubmed_index", "1"));

        let doc = v7.hits[0].source.clone().into_document().unwrap();
        assert_eq!(doc.pmid, "11");
        assert_eq!(doc.mesh_set.len(), 2);
    }

    #[test]
    fn test_parse_page_keeps_hits_with_null_fields() {
        // Skipping is the scroll's decision, decoding must not fail
        let page = parse_page(json!({
            "hits": { "total": 1, "hits": [{
                "_index": "i", "_id": "1", "_score": null,
                "_source": { "pmid": "1", "title": null, "abstract": "a", "mesh_set": null }
            }]}
        })).unwrap();
        assert_eq!(page.hits.len(), 1);
        assert!(page.hits[0].source.clone().into_document().is_none());
    }

    #[test]
    fn test_parse_page_rejects_garbage() {
        assert!(matches!(parse_page(json!({ "oops": true })), Err(SearchError::Decode(_))));
    }
}
