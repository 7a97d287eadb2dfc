// ============================================================
// Layer 6 - Corpus Store
// ============================================================
// Persists PU tasks on disk:
//
//   {root}/L{lp}_U{u}/{D1.D2.D3}/train.jsonl
//                                valid.jsonl
//                                test.jsonl
//                                metadata.json
//
// One LabeledDocument per line, fields in a fixed order
// (pmid, title, abstract, mesh_set, label, label_true, score,
// rank), so the same corpus always produces the same bytes.
//
// Reference: Rust Book §12 (I/O), serde_json documentation

use anyhow::{Context, Result};
use std::{
    fs,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::corpus::{CorpusMetadata, PuCorpus};
use crate::domain::document::LabeledDocument;
use crate::domain::query::Conjunction;

pub const METADATA_FILE: &str = "metadata.json";

pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn task_dir(&self, lp_size: usize, u_size: usize, conjunction: &Conjunction) -> PathBuf {
        self.root
            .join(format!("L{lp_size}_U{u_size}"))
            .join(conjunction.dotted())
    }

    /// Write the three splits and metadata.json into `dir`
    pub fn write(&self, dir: &Path, corpus: &PuCorpus) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create task directory '{}'", dir.display()))?;

        for (name, docs) in corpus.split.named() {
            let path = dir.join(format!("{name}.jsonl"));
            write_jsonl(&path, docs)?;
            tracing::debug!("Wrote {} documents to '{}'", docs.len(), path.display());
        }

        let path = dir.join(METADATA_FILE);
        fs::write(&path, serde_json::to_string_pretty(&corpus.metadata)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::info!("Task written to '{}'", dir.display());
        Ok(())
    }
}

fn write_jsonl(path: &Path, docs: &[LabeledDocument]) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut out = BufWriter::new(file);
    for doc in docs {
        serde_json::to_writer(&mut out, doc)?;
        out.write_all(b"\n")?;
    }
    out.flush().with_context(|| format!("Cannot write '{}'", path.display()))
}

pub fn read_split(path: impl AsRef<Path>) -> Result<Vec<LabeledDocument>> {
    let path = path.as_ref();
    let file = fs::File::open(path).with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut docs = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed document", path.display(), idx + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}

pub fn read_metadata(dir: impl AsRef<Path>) -> Result<CorpusMetadata> {
    let path = dir.as_ref().join(METADATA_FILE);
    let json = fs::read_to_string(&path).with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed metadata '{}'", path.display()))
}
