//! Listing configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file at all) is valid.
//!
//! ```toml
//! [render]
//! color = false
//! show_movement = true
//! show_raw_words = true
//!
//! [reader]
//! max_string_len = 8192
//! ```

use crate::error::{FormatError, Result};
use crate::util::MAX_STRING_LEN;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Dim comments and embolden headers with ANSI styling
    pub color: bool,
    /// Print the movement region after the code listing
    pub show_movement: bool,
    /// Print the raw opcode word on each instruction line
    pub show_raw_words: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            color: false,
            show_movement: true,
            show_raw_words: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub max_string_len: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            max_string_len: MAX_STRING_LEN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub render: RenderOptions,
    pub reader: ReaderOptions,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Config> {
        toml::from_str(text).map_err(|e| FormatError::BadConfig(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.render.show_movement);
        assert_eq!(config.reader.max_string_len, MAX_STRING_LEN);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            "[render]\ncolor = true\nshow_movement = false\n\n[reader]\nmax_string_len = 64\n",
        )
        .unwrap();
        assert!(config.render.color);
        assert!(!config.render.show_movement);
        assert!(config.render.show_raw_words);
        assert_eq!(config.reader.max_string_len, 64);
    }

    #[test]
    fn test_bad_config() {
        let err = Config::from_toml_str("[render]\ncolor = \"yes\"\n").unwrap_err();
        assert!(matches!(err, FormatError::BadConfig(_)));
    }
}
