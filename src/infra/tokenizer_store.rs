// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Word-level vocabulary for titles and abstracts, persisted as
// a HuggingFace tokenizer.json next to the checkpoints so that
// training and evaluation map words to the same ids.
//
// Every training run rebuilds the vocabulary from its own train
// split; evaluation only ever loads.
//
// Id layout:
//   0      [PAD]  (masked out by mean pooling)
//   1      [UNK]
//   2..    words by descending corpus frequency, ties broken
//          alphabetically so rebuilding gives the same ids
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper, so the JSON is written by hand and
// loaded back with Tokenizer::from_file.
//
// Reference: tokenizers crate documentation (WordLevel model)

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::Tokenizer;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;

const SPECIAL_TOKENS: [&str; 2] = ["[PAD]", "[UNK]"];
const FILE_NAME: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.dir.join(FILE_NAME);
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Build the vocabulary from `texts`, replacing any saved tokenizer
    pub fn build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Word frequencies, split the way the Whitespace pre-tokenizer splits ──
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
                *freq.entry(word.to_lowercase()).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS.len()));

        // ── Vocabulary ────────────────────────────────────────────────────────
        let mut vocab = serde_json::Map::new();
        for (id, token) in SPECIAL_TOKENS.iter().enumerate() {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }
        for (word, _) in &words {
            let id = vocab.len();
            vocab.entry(word.clone()).or_insert_with(|| serde_json::json!(id));
        }
        let size = vocab.len();

        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .enumerate()
            .map(|(id, token)| serde_json::json!({
                "id": id, "content": token, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.dir.join(FILE_NAME);
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;
        tracing::info!("Tokenizer built with {} entries, saved to '{}'", size, path.display());

        self.load()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequent_words_get_low_ids_and_unknowns_map_to_unk() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let texts = vec!["cardiac cardiac stem".to_string(), "Cardiac, therapy".to_string()];
        let tok   = store.build(&texts, 10).unwrap();

        let ids = tok.encode("cardiac stem zebrafish", false).unwrap().get_ids().to_vec();
        assert_eq!(ids, vec![2, 3, UNK_ID]);
    }

    #[test]
    fn test_load_gives_the_built_vocabulary() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let built = store.build(&["alpha beta gamma beta".to_string()], 100).unwrap();
        let again = store.load().unwrap();

        assert_eq!(built.get_vocab(false), again.get_vocab(false));
        assert_eq!(again.get_vocab_size(false), 5);
    }

    #[test]
    fn test_rebuild_replaces_previous_vocabulary() {
        let dir   = tempfile::tempdir().unwrap();
        TokenizerStore::new(dir.path()).build(&["alpha beta gamma".to_string()], 100).unwrap();
        let fresh = TokenizerStore::new(dir.path()).build(&["delta".to_string()], 100).unwrap();

        assert_eq!(fresh.token_to_id("delta"), Some(2));
        assert_eq!(fresh.token_to_id("alpha"), None);
        assert_eq!(TokenizerStore::new(dir.path()).load().unwrap().get_vocab_size(false), 3);
    }

    #[test]
    fn test_vocab_size_caps_words() {
        let dir = tempfile::tempdir().unwrap();
        let tok = TokenizerStore::new(dir.path())
            .build(&["a a a b b c".to_string()], 4)
            .unwrap();
        assert_eq!(tok.token_to_id("a"), Some(2));
        assert_eq!(tok.token_to_id("b"), Some(3));
        assert_eq!(tok.token_to_id("c"), None);
    }
}
