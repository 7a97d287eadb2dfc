// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Everything that talks to the outside world:
//
//   elastic.rs         - Elasticsearch over blocking HTTP: the
//                        scroll API for reads, index administration
//                        for the index builder
//
//   corpus_store.rs    - Writes and reads the PU task layout
//                        {out}/L{lp}_U{u}/{D1.D2}/{split}.jsonl
//
//   mesh_map.rs        - MeSH id → descriptor name lookup
//
//   checkpoint.rs      - Burn CompactRecorder weights, best and
//                        latest epoch markers, TrainConfig as JSON
//
//   tokenizer_store.rs - Word-level vocabulary built from the
//                        training split and saved next to the
//                        checkpoints
//
//   metrics.rs         - Binary counts and the per-epoch CSV
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Elasticsearch search and administration client
pub mod elastic;

/// In-memory search index for tests
#[cfg(test)]
pub mod memory_index;

/// PU task persistence
pub mod corpus_store;

/// MeSH descriptor names
pub mod mesh_map;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving and loading
pub mod tokenizer_store;

/// Binary metrics and the metrics CSV logger
pub mod metrics;
