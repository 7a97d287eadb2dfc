// ============================================================
// Layer 4 - PubMed Dump Loader
// ============================================================
// Reads the PubMed dump files that feed the index builder.
// The format follows the file name:
//
//   *.xml.gz, *.xml  NLM baseline / update files, parsed by
//                    pubmed_xml
//   *.jsonl          one article per line:
//
//     {"pmid": "30000001", "title": "...", "abstract": "...",
//      "mesh_set": ["D000328", "D008875"]}
//
// In JSONL `mesh_set` may also be a space-joined string.
// Articles without a title, an abstract or any MeSH heading
// cannot take part in a PU task and are skipped and counted,
// the same rule the scroll applies when reading the index back.
//
// Files are visited in name order so repeated builds index
// documents in the same order.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (Reading Files)

use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::data::{preprocessor::Preprocessor, pubmed_xml};
use crate::domain::document::{Document, PubmedRecord};

/// Documents of one dump file plus the number of unusable records
#[derive(Debug, Default)]
pub struct LoadedFile {
    pub documents: Vec<Document>,
    pub skipped:   usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DumpFormat {
    Jsonl,
    Xml,
    XmlGz,
}

impl DumpFormat {
    fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".jsonl") {
            Some(DumpFormat::Jsonl)
        } else if name.ends_with(".xml.gz") {
            Some(DumpFormat::XmlGz)
        } else if name.ends_with(".xml") {
            Some(DumpFormat::Xml)
        } else {
            None
        }
    }
}

pub struct PubmedDumpLoader {
    dir:          PathBuf,
    preprocessor: Preprocessor,
}

impl PubmedDumpLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), preprocessor: Preprocessor::new() }
    }

    /// Every dump file of a known format, sorted by name
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read dump directory '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && DumpFormat::of(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        tracing::info!("Found {} dump files in '{}'", files.len(), self.dir.display());
        Ok(files)
    }

    fn clean(&self, field: Option<String>) -> Option<String> {
        field
            .map(|text| self.preprocessor.clean(&text))
            .filter(|text| !text.is_empty())
    }

    pub fn load_file(&self, path: &Path) -> Result<LoadedFile> {
        let file = fs::File::open(path).with_context(|| format!("Cannot open '{}'", path.display()))?;
        let records = match DumpFormat::of(path) {
            Some(DumpFormat::Jsonl) => read_jsonl(BufReader::new(file), path)?,
            Some(DumpFormat::Xml)   => pubmed_xml::read_articles(BufReader::new(file))
                .with_context(|| format!("Cannot parse '{}'", path.display()))?,
            Some(DumpFormat::XmlGz) => pubmed_xml::read_articles(BufReader::new(MultiGzDecoder::new(file)))
                .with_context(|| format!("Cannot parse '{}'", path.display()))?,
            None => bail!("'{}' is not a .jsonl, .xml or .xml.gz dump", path.display()),
        };

        let mut loaded = LoadedFile::default();
        for mut record in records {
            record.title         = self.clean(record.title);
            record.abstract_text = self.clean(record.abstract_text);

            match record.into_document() {
                Some(doc) => loaded.documents.push(doc),
                None      => loaded.skipped += 1,
            }
        }

        tracing::debug!(
            "Loaded {} documents from '{}' ({} skipped)",
            loaded.documents.len(),
            path.display(),
            loaded.skipped
        );
        Ok(loaded)
    }
}

fn read_jsonl(reader: impl BufRead, path: &Path) -> Result<Vec<PubmedRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed PubMed record", path.display(), idx + 1))?;
        records.push(record);
    }
    Ok(records)
}
