// ============================================================
// Layer 2 - IndexUseCase
// ============================================================
// Rebuilds the PubMed index from a directory of PubMed dumps
// (JSON Lines or the gzip-compressed baseline XML):
//
//   Step 1: Drop the index       (missing index is fine)
//   Step 2: Create it with the PubMed mapping
//   Step 3: Index every usable record, file by file
//   Step 4: Refresh so the next `build` sees every document
//
// A write that reaches only some shards is logged with its PMID
// and the run continues. A write that fails outright aborts the
// run; documents already written stay in the index.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::PubmedDumpLoader;
use crate::domain::traits::{IndexAdmin, IndexDeletion};
use crate::infra::elastic::ElasticClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub es_url:     String,
    pub index_name: String,
    pub dump_dir:   String,
}

/// Counts for one indexing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub files:   usize,
    pub indexed: usize,
    pub skipped: usize,
    /// Writes acknowledged by fewer shards than requested
    pub partial: usize,
}

pub struct IndexUseCase {
    config: IndexConfig,
}

impl IndexUseCase {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<IndexReport> {
        let cfg    = &self.config;
        let client = ElasticClient::new(&cfg.es_url, &cfg.index_name)
            .with_context(|| format!("Cannot connect to '{}'", cfg.es_url))?;
        rebuild_index(&client, &PubmedDumpLoader::new(&cfg.dump_dir))
    }
}

pub fn rebuild_index<A: IndexAdmin + ?Sized>(admin: &A, loader: &PubmedDumpLoader) -> Result<IndexReport> {
    // ── Step 1-2: fresh index ─────────────────────────────────────────────────
    match admin.delete_index().context("Failed to delete the index")? {
        IndexDeletion::Deleted => tracing::info!("Deleted the existing index"),
        IndexDeletion::Missing => tracing::info!("Index did not exist"),
    }
    admin.create_index().context("Failed to create the index")?;

    // ── Step 3: documents ─────────────────────────────────────────────────────
    let mut report = IndexReport::default();
    for path in loader.files()? {
        let loaded = loader.load_file(&path)?;
        for doc in &loaded.documents {
            let outcome = admin
                .index_document(doc)
                .with_context(|| format!("Failed to index PMID {}", doc.pmid))?;
            if outcome.is_partial() {
                tracing::warn!(
                    "PMID {} written to {} of {} shards",
                    doc.pmid,
                    outcome.shards_total - outcome.shards_failed,
                    outcome.shards_total
                );
                report.partial += 1;
            }
        }
        report.files   += 1;
        report.indexed += loaded.documents.len();
        report.skipped += loaded.skipped;
        tracing::info!("Indexed '{}': {} documents", path.display(), report.indexed);
    }

    // ── Step 4: visibility ────────────────────────────────────────────────────
    admin.refresh().context("Failed to refresh the index")?;
    if report.skipped > 0 {
        tracing::warn!("Skipped {} records without title, abstract or MeSH headings", report.skipped);
    }
    Ok(report)
}
