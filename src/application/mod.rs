// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// One use case per CLI command. Each one turns a plain config
// struct into calls on the data, ml and infra layers.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination and progress logging
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Rebuild the PubMed index from JSONL or baseline XML dumps
pub mod index_use_case;

// Construct PU tasks from the index
pub mod build_use_case;

// PU (or PN baseline) training on a built task
pub mod train_use_case;

// Score a split with a trained checkpoint
pub mod evaluate_use_case;
