//! Text normalization for the local model: named cleaners, then a lookup of
//! each resulting character in the model's symbol table.

pub mod cleaners;

use crate::{Result, SynthesisError};
use std::collections::HashMap;

pub type Cleaner = fn(&str) -> String;

/// Resolve a cleaner by the name used in model configs.
pub fn cleaner_by_name(name: &str) -> Result<Cleaner> {
    match name {
        "chinese_cleaners" => Ok(cleaners::chinese_cleaners),
        "zh_ja_mixture_cleaners" => Ok(cleaners::zh_ja_mixture_cleaners),
        "sanskrit_cleaners" => Ok(cleaners::sanskrit_cleaners),
        other => Err(SynthesisError::UnknownCleaner(other.to_string())),
    }
}

/// Run the named cleaners in order.
pub fn clean_text<S: AsRef<str>>(text: &str, cleaner_names: &[S]) -> Result<String> {
    let mut out = text.to_string();
    for name in cleaner_names {
        out = cleaner_by_name(name.as_ref())?(&out);
    }
    Ok(out)
}

/// Character → id mapping over a model's symbol list.
///
/// Multi-character entries can never match a single character and are ignored;
/// for duplicated symbols the last index wins.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    ids: HashMap<char, i64>,
}

impl SymbolTable {
    pub fn new<S: AsRef<str>>(symbols: &[S]) -> Self {
        let mut ids = HashMap::with_capacity(symbols.len());
        for (i, s) in symbols.iter().enumerate() {
            let mut chars = s.as_ref().chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                ids.insert(c, i as i64);
            }
        }
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Characters missing from the table are skipped.
    pub fn encode(&self, cleaned: &str) -> Vec<i64> {
        cleaned.chars().filter_map(|c| self.ids.get(&c).copied()).collect()
    }
}

pub fn text_to_sequence<S: AsRef<str>>(
    text: &str,
    symbols: &SymbolTable,
    cleaner_names: &[S],
) -> Result<Vec<i64>> {
    let cleaned = clean_text(text, cleaner_names)?;
    Ok(symbols.encode(&cleaned))
}

/// `[blank, s1, blank, s2, …, sn, blank]`
pub fn intersperse(seq: &[i64], blank: i64) -> Vec<i64> {
    let mut out = vec![blank; seq.len() * 2 + 1];
    for (i, id) in seq.iter().enumerate() {
        out[i * 2 + 1] = *id;
    }
    out
}
