// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between the search index and GPU-ready batches.
//
// Corpus construction (the `index` and `build` commands):
//
//   *.jsonl / *.xml.gz dumps
//       │
//       ▼
//   PubmedDumpLoader  → reads dump files, skips incomplete records
//                       (baseline XML parsed by pubmed_xml)
//       │
//       ▼
//   Preprocessor      → one-line, single-spaced title and abstract
//       │
//       ▼
//   (search index)
//       │
//       ▼
//   Scroll            → cursor pagination over every matching hit
//       │
//       ▼
//   CorpusBuilder     → P, LP and the similarity-biased pool U
//       │
//       ▼
//   assemble_splits   → stratified train / valid / test + metadata
//
// Training (the `train` and `evaluate` commands):
//
//   split.jsonl
//       │
//       ▼
//   SplitReader          → PuInstance (token ids, noisy + true label)
//       │
//       ▼
//   ProportionalBatches  → class-balanced minibatches
//       │
//       ▼
//   PuBatcher            → padded tensors
//
// Reference: Burn Book §4 (Datasets)
//            Rust Book §13 (Iterators and Closures)

/// Reads PubMed dump files for the index builder
pub mod loader;

/// Streaming reader for PubMed baseline XML
pub mod pubmed_xml;

/// Whitespace and control character normalisation
pub mod preprocessor;

/// Lazy cursor pagination over the search index
pub mod scroll;

/// 50/25/25 stratum splitting
pub mod splitter;

/// PU task construction and split assembly
pub mod corpus;

/// Proportional minibatch scheduling for skewed label pools
pub mod proportional;

/// Split file reader producing training instances
pub mod reader;

/// Implements Burn's Dataset trait for PU instances
pub mod dataset;

/// Pads instances into tensor batches
pub mod batcher;
