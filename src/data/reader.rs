// ============================================================
// Layer 4 - Split Reader
// ============================================================
// Reads a persisted split file (one labeled document per line)
// into tokenised PuInstances.
//
// A split is addressed by a spec string:
//
//   data/L20_U100000/D1.D2/train.jsonl?label=label&size=0&limit=10&max_length=300
//
//   label       JSON field used as the training label (required).
//               "label" trains PU, "label_true" trains the oracle.
//   size        keep at most this many instances (<= 0: no limit)
//   limit       keep at most this many positive/labeled instances
//   max_length  drop instances whose abstract has more tokens
//   evaluation  true | false, marks instances as evaluation data
//
// Malformed spec strings, missing label fields and unknown
// label strings are configuration errors. Over-long documents
// are a data issue: they are dropped and counted per class.
//
// Reference: Rust Book §9 (Error Handling), §12 (Reading Files)

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use tokenizers::Tokenizer;

use crate::data::dataset::{PuDataset, PuInstance};
use crate::domain::document::PuLabel;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("invalid reader spec: {0}")]
    InvalidSpec(String),

    #[error("cannot read split file '{path}': {source}")]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("line {line}: invalid JSON: {source}")]
    Json {
        line:   usize,
        source: serde_json::Error,
    },

    #[error("line {line}: field '{field}' not found")]
    MissingField { field: String, line: usize },

    #[error("line {line}: unknown label '{value}'")]
    UnknownLabel { value: String, line: usize },

    #[error("tokenisation failed: {0}")]
    Tokenize(String),
}

// ─── ReaderSpec ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSpec {
    pub path:        PathBuf,
    pub label_field: String,
    pub size:        Option<usize>,
    pub limit:       Option<usize>,
    pub max_length:  Option<usize>,
    pub evaluation:  bool,
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ReaderError> {
    value
        .parse()
        .map_err(|_| ReaderError::InvalidSpec(format!("'{key}' expects a number, got '{value}'")))
}

impl FromStr for ReaderSpec {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, query) = s.split_once('?').unwrap_or((s, ""));
        if path.is_empty() {
            return Err(ReaderError::InvalidSpec(format!("no file path in '{s}'")));
        }

        let mut label_field = None;
        let mut spec = ReaderSpec {
            path:        PathBuf::from(path),
            label_field: String::new(),
            size:        None,
            limit:       None,
            max_length:  None,
            evaluation:  false,
        };

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ReaderError::InvalidSpec(format!("'{pair}' is not key=value")))?;
            match key {
                "label" => label_field = Some(value.to_string()),
                "size" => {
                    let size: i64 = parse_number(key, value)?;
                    spec.size = (size > 0).then_some(size as usize);
                }
                "limit"      => spec.limit = Some(parse_number(key, value)?),
                "max_length" => spec.max_length = Some(parse_number(key, value)?),
                "evaluation" => {
                    spec.evaluation = match value {
                        "true"  => true,
                        "false" => false,
                        other   => {
                            return Err(ReaderError::InvalidSpec(format!(
                                "'evaluation' must be true or false, got '{other}'"
                            )))
                        }
                    }
                }
                other => return Err(ReaderError::InvalidSpec(format!("unknown key '{other}'"))),
            }
        }

        spec.label_field = label_field
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ReaderError::InvalidSpec(format!("'label' is required in '{s}'")))?;
        Ok(spec)
    }
}

// ─── ReadStats ────────────────────────────────────────────────────────────────
/// Counts of kept and length-dropped instances per training label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub positives:         usize,
    pub unlabeled:         usize,
    pub dropped_positive:  usize,
    pub dropped_unlabeled: usize,
}

impl ReadStats {
    pub fn kept(&self) -> usize {
        self.positives + self.unlabeled
    }
}

// ─── SplitReader ──────────────────────────────────────────────────────────────
pub struct SplitReader<'t> {
    spec:      ReaderSpec,
    tokenizer: &'t Tokenizer,
}

fn text_field<'v>(record: &'v Value, field: &str, line: usize) -> Result<&'v str, ReaderError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ReaderError::MissingField { field: field.to_string(), line })
}

fn label_field(record: &Value, field: &str, line: usize) -> Result<PuLabel, ReaderError> {
    let value = text_field(record, field, line)?;
    PuLabel::parse(value).ok_or_else(|| ReaderError::UnknownLabel { value: value.to_string(), line })
}

impl<'t> SplitReader<'t> {
    pub fn new(spec: ReaderSpec, tokenizer: &'t Tokenizer) -> Self {
        Self { spec, tokenizer }
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>, ReaderError> {
        self.tokenizer
            .encode(text, false)
            .map(|enc| enc.get_ids().to_vec())
            .map_err(|e| ReaderError::Tokenize(e.to_string()))
    }

    pub fn read(&self) -> Result<(PuDataset, ReadStats), ReaderError> {
        let spec = &self.spec;
        tracing::info!("Reading '{}' with {:?}", spec.path.display(), spec);

        let content = fs::read_to_string(&spec.path)
            .map_err(|source| ReaderError::Io { path: spec.path.clone(), source })?;

        let mut stats     = ReadStats::default();
        let mut instances = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let record: Value =
                serde_json::from_str(raw).map_err(|source| ReaderError::Json { line, source })?;

            let label = label_field(&record, &spec.label_field, line)?;
            if label.is_positive() && spec.limit.is_some_and(|limit| stats.positives >= limit) {
                continue;
            }

            let instance = PuInstance {
                pmid:         text_field(&record, "pmid", line)?.to_string(),
                title_ids:    self.encode(text_field(&record, "title", line)?)?,
                abstract_ids: self.encode(text_field(&record, "abstract", line)?)?,
                label,
                label_true:   label_field(&record, "label_true", line)?,
                evaluation:   spec.evaluation,
            };

            if spec.max_length.is_some_and(|max| instance.abstract_ids.len() > max) {
                if label.is_positive() {
                    stats.dropped_positive += 1;
                } else {
                    stats.dropped_unlabeled += 1;
                }
                continue;
            }

            // size and limit count kept instances only, never length drops
            if label.is_positive() {
                stats.positives += 1;
            } else {
                stats.unlabeled += 1;
            }
            instances.push(instance);

            if spec.size.is_some_and(|size| stats.kept() >= size) {
                break;
            }
        }

        tracing::info!(
            "Loaded {} samples. {} positive/labeled and {} negative/unlabeled",
            stats.kept(),
            stats.positives,
            stats.unlabeled
        );
        if stats.dropped_positive + stats.dropped_unlabeled > 0 {
            tracing::warn!(
                "Skipped {} LP samples and {} U samples due to length",
                stats.dropped_positive,
                stats.dropped_unlabeled
            );
        }
        Ok((PuDataset::new(instances), stats))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::io::Write;

    use burn::data::dataset::Dataset;

    use super::*;
    use crate::domain::document::{Document, LabeledDocument};
    use crate::infra::tokenizer_store::TokenizerStore;

    struct Fixture {
        dir:       tempfile::TempDir,
        tokenizer: Tokenizer,
    }

    impl Fixture {
        /// 3 labeled positives (one with a long abstract), then 4 unlabeled
        /// documents of which the first is a hidden positive.
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut lines = Vec::new();
            for i in 0..3 {
                let abstract_text = if i == 1 { "stem cell ".repeat(10) } else { "stem cell".to_string() };
                let doc = Document::new(format!("lp{i}"), "heart repair", abstract_text, ["D1"]);
                lines.push(LabeledDocument::labeled_positive(doc));
            }
            for i in 0..4 {
                let mut doc = LabeledDocument::labeled_positive(Document::new(
                    format!("u{i}"),
                    "plant genome",
                    "seed growth",
                    ["D9"],
                ));
                doc.label = PuLabel::Negative;
                if i > 0 {
                    doc.label_true = PuLabel::Negative;
                }
                lines.push(doc);
            }

            let mut file = fs::File::create(dir.path().join("train.jsonl")).unwrap();
            for doc in &lines {
                writeln!(file, "{}", serde_json::to_string(doc).unwrap()).unwrap();
            }
            writeln!(file).unwrap();

            let texts = vec!["heart repair stem cell plant genome seed growth".to_string()];
            let tokenizer = TokenizerStore::new(dir.path().join("tok")).build(&texts, 100).unwrap();
            Self { dir, tokenizer }
        }

        fn read(&self, query: &str) -> Result<(PuDataset, ReadStats), ReaderError> {
            let spec = format!("{}?{}", self.dir.path().join("train.jsonl").display(), query);
            SplitReader::new(spec.parse()?, &self.tokenizer).read()
        }
    }

    #[test]
    fn test_parse_full_spec() {
        let spec: ReaderSpec = "d/train.jsonl?label=label_true&size=-1&limit=5&max_length=300&evaluation=true"
            .parse()
            .unwrap();
        assert_eq!(spec.path, PathBuf::from("d/train.jsonl"));
        assert_eq!(spec.label_field, "label_true");
        assert_eq!(spec.size, None);
        assert_eq!(spec.limit, Some(5));
        assert_eq!(spec.max_length, Some(300));
        assert!(spec.evaluation);
    }

    #[test]
    fn test_rejects_bad_specs() {
        for bad in [
            "d/train.jsonl",
            "d/train.jsonl?label=label&evaluation=yes",
            "d/train.jsonl?label=label&size=ten",
            "d/train.jsonl?label=label&colour=red",
            "d/train.jsonl?label",
            "?label=label",
        ] {
            assert!(matches!(bad.parse::<ReaderSpec>(), Err(ReaderError::InvalidSpec(_))), "{bad}");
        }
    }

    #[test]
    fn test_reads_noisy_labels() {
        let fx = Fixture::new();
        let (data, stats) = fx.read("label=label").unwrap();
        assert_eq!((stats.positives, stats.unlabeled), (3, 4));
        assert_eq!(data.len(), 7);

        let first = data.get(0).unwrap();
        assert_eq!(first.pmid, "lp0");
        assert_eq!(first.title_ids.len(), 2);
        assert!(!first.evaluation);
    }

    #[test]
    fn test_label_true_field_reveals_hidden_positive() {
        let fx = Fixture::new();
        let (_, stats) = fx.read("label=label_true&evaluation=true").unwrap();
        assert_eq!((stats.positives, stats.unlabeled), (4, 3));
    }

    #[test]
    fn test_limit_and_size() {
        let fx = Fixture::new();
        let (data, stats) = fx.read("label=label&limit=1").unwrap();
        assert_eq!((stats.positives, stats.unlabeled), (1, 4));
        assert_eq!(data.label_counts(), (1, 4));

        let (data, _) = fx.read("label=label&size=2").unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_max_length_drops_and_counts() {
        let fx = Fixture::new();
        let (data, stats) = fx.read("label=label&max_length=5").unwrap();
        assert_eq!(stats.dropped_positive, 1);
        assert_eq!(stats.dropped_unlabeled, 0);
        assert_eq!(data.len(), 6);
        assert!(data.instances().iter().all(|i| i.pmid != "lp1"));
    }

    #[test]
    fn test_length_drops_do_not_use_up_the_limit() {
        let fx = Fixture::new();
        let (data, stats) = fx.read("label=label&limit=2&max_length=5").unwrap();
        assert_eq!(stats.positives, 2);
        assert_eq!(stats.dropped_positive, 1);

        let labeled: Vec<&str> = data
            .instances()
            .iter()
            .filter(|i| i.label.is_positive())
            .map(|i| i.pmid.as_str())
            .collect();
        assert_eq!(labeled, ["lp0", "lp2"]);
    }

    #[test]
    fn test_missing_label_field_is_an_error() {
        let fx = Fixture::new();
        let err = fx.read("label=noisy").unwrap_err();
        assert!(matches!(err, ReaderError::MissingField { line: 1, .. }));
    }

    #[test]
    fn test_unknown_label_value_is_an_error() {
        let fx = Fixture::new();
        let err = fx.read("label=pmid").unwrap_err();
        assert!(matches!(err, ReaderError::UnknownLabel { line: 1, .. }));
    }
}
