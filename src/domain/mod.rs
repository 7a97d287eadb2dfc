// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types describing the PubMed PU benchmark:
//
//   document.rs  - Document, its compact index reference, the
//                  noisy/true label pair and labeled documents
//   query.rs     - MeSH conjunctions, minimum-should-match and
//                  the backend-agnostic search query model
//   corpus.rs    - Corpus splits and the metadata persisted
//                  next to them
//   traits.rs    - The search index protocol the corpus
//                  constructor drives
//
// Rules for this layer:
//   - NO Burn types, NO HTTP, NO file I/O
//   - Only structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod document;

pub mod query;

pub mod corpus;

pub mod traits;
