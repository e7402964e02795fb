// ============================================================
// Layer 6: Tokenizer Store
// ============================================================
// Builds a word-level tokenizer from the training texts and
// persists it as tokenizer.json next to the checkpoints.
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper. Writing the tokenizer JSON directly
// and loading it with Tokenizer::from_file avoids that.
//
// Ids are contiguous:
//   0        [PAD]
//   1        [UNK]
//   2..      words by descending frequency, ties alphabetical
//
// so every id is below `vocab_size` and can index the
// embedding table directly.

use anyhow::{anyhow, Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::{
    Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer,
};

use crate::data::batcher::PAD_ID;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const UNK_ID: u32 = 1;

const SPECIAL_TOKENS: usize = 2;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load a previously saved tokenizer.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Build a vocabulary of at most `vocab_size` entries from
    /// `texts`, save it, and load it back.
    pub fn build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Word frequencies ──────────────────────────────────────────
        // Counted with the same normalizer and pre-tokenizer the saved
        // tokenizer encodes with, so every counted word is reachable.
        let splitter = parse_tokenizer(&tokenizer_json(special_vocab()))?;
        let freq = word_counts(&splitter, texts)?;

        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS));

        // ── Step 2: Vocab JSON ────────────────────────────────────────────────
        let mut vocab = special_vocab();
        for (i, (word, _)) in words.iter().enumerate() {
            vocab[word] = serde_json::json!(i + SPECIAL_TOKENS);
        }

        // ── Step 3: HuggingFace tokenizer JSON ────────────────────────────────
        let tok_path = self.path();
        std::fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json(vocab))?)
            .with_context(|| "Cannot write tokenizer JSON")?;

        tracing::info!(
            "Tokenizer built with {} entries, saved to '{}'",
            words.len() + SPECIAL_TOKENS,
            tok_path.display()
        );

        self.load()
    }
}

fn special_vocab() -> serde_json::Value {
    serde_json::json!({
        "[PAD]": PAD_ID,
        "[UNK]": UNK_ID,
    })
}

fn tokenizer_json(vocab: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": PAD_ID, "content": PAD_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": UNK_ID, "content": UNK_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": false,
            "lowercase": true
        },
        "pre_tokenizer": {
            "type": "Whitespace"
        },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    })
}

fn parse_tokenizer(json: &serde_json::Value) -> Result<Tokenizer> {
    serde_json::to_string(json)?
        .parse::<Tokenizer>()
        .map_err(|e| anyhow!("Invalid tokenizer JSON: {e}"))
}

/// Occurrences of each normalized word, split exactly as `splitter` splits.
fn word_counts(splitter: &Tokenizer, texts: &[String]) -> Result<HashMap<String, usize>> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        let mut pre = PreTokenizedString::from(text.as_str());
        if let Some(normalizer) = splitter.get_normalizer() {
            pre.normalize(|s| normalizer.normalize(s))
                .map_err(|e| anyhow!("Normalisation error: {e}"))?;
        }
        if let Some(pre_tokenizer) = splitter.get_pre_tokenizer() {
            pre_tokenizer
                .pre_tokenize(&mut pre)
                .map_err(|e| anyhow!("Pre-tokenisation error: {e}"))?;
        }
        for (word, _, _) in pre.get_splits(OffsetReferential::Original, OffsetType::Byte) {
            if !word.is_empty() {
                *freq.entry(word.to_string()).or_insert(0) += 1;
            }
        }
    }
    Ok(freq)
}

/// Token ids of `text`, without special tokens.
pub fn encode_ids(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
    let enc = tokenizer
        .encode(text, false)
        .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
    Ok(enc.get_ids().to_vec())
}
