//! VITS training hyper-parameters (`config.json` next to the checkpoint).
//!
//! Only the fields inference needs are read; everything else is ignored.

use crate::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VitsHParams {
    #[serde(default)]
    pub data: DataParams,
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataParams {
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,
    #[serde(default)]
    pub text_cleaners: Vec<String>,
    #[serde(default)]
    pub add_blank: bool,
    #[serde(default)]
    pub n_speakers: u32,
}

fn default_sampling_rate() -> u32 {
    22_050
}

impl Default for DataParams {
    fn default() -> Self {
        Self {
            sampling_rate: default_sampling_rate(),
            text_cleaners: Vec::new(),
            add_blank: false,
            n_speakers: 0,
        }
    }
}

impl VitsHParams {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_multi_speaker(&self) -> bool {
        self.data.n_speakers > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_inference_fields_and_ignores_the_rest() {
        let hp = VitsHParams::from_json(
            r#"{
                "train": {"segment_size": 8192},
                "data": {"sampling_rate": 22050, "text_cleaners": ["chinese_cleaners"],
                         "add_blank": true, "n_speakers": 4, "filter_length": 1024},
                "model": {"inter_channels": 192},
                "symbols": ["_", ",", "a"]
            }"#,
        )
        .unwrap();
        assert_eq!(hp.data.sampling_rate, 22_050);
        assert_eq!(hp.data.text_cleaners, vec!["chinese_cleaners"]);
        assert!(hp.data.add_blank);
        assert!(hp.is_multi_speaker());
        assert_eq!(hp.symbols.len(), 3);
    }

    #[test]
    fn missing_data_block_uses_defaults() {
        let hp = VitsHParams::from_json(r#"{"symbols": ["a"]}"#).unwrap();
        assert_eq!(hp.data.sampling_rate, 22_050);
        assert!(!hp.data.add_blank);
    }
}
