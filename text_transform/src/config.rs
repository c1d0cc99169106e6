//! Layout parameters for the [`crate::Composer`].
//!
//! Loaded from a TOML file, with optional CLI override:
//!
//! ```toml
//! tab_width = 4
//! wrap_mode = "word"
//! characters_per_line = 100
//! continuation_indent = 2
//! fold_width = 3
//! ```
//!
//! Every key is optional and unknown keys are rejected.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a visual line may be broken when it exceeds
/// [`LayoutConfig::characters_per_line`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Never wrap.
    NoWrap,
    /// Break between any two characters.
    Anywhere,
    /// Break only between words; a word longer than a line overflows.
    #[default]
    Word,
    /// Break between words, or inside a word that cannot fit on a line alone.
    WordBoundaryOrAnywhere,
}

impl std::str::FromStr for WrapMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "no_wrap" => Ok(WrapMode::NoWrap),
            "anywhere" => Ok(WrapMode::Anywhere),
            "word" => Ok(WrapMode::Word),
            "word_boundary_or_anywhere" | "word_or_anywhere" => Ok(WrapMode::WordBoundaryOrAnywhere),
            other => anyhow::bail!("Unknown wrap mode: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Columns a tab advances to the next multiple of.
    pub tab_width: usize,

    pub wrap_mode: WrapMode,

    /// Width at which lines wrap, in columns.
    pub characters_per_line: usize,

    /// Indent width of continuation lines after a wrap.
    pub continuation_indent: usize,

    /// Width of the placeholder drawn for a fold.
    pub fold_width: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tab_width: 4,
            wrap_mode: WrapMode::Word,
            characters_per_line: 80,
            continuation_indent: 0,
            fold_width: 3,
        }
    }
}

impl LayoutConfig {
    /// Read and deserialize a TOML config file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout config: {}", path.display()))?;

        let config: LayoutConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse layout config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with priority: CLI override > discovered path > defaults.
    pub fn load_with_overrides(
        cli_override: Option<&Path>,
        discovered_path: Option<&Path>,
    ) -> Result<Self> {
        if let Some(path) = cli_override {
            return Self::load(path);
        }
        if let Some(path) = discovered_path {
            return Self::load(path);
        }
        Ok(Self::default())
    }

    /// Reject settings a hand-built config can carry but a file should not.
    ///
    /// Layout itself tolerates them: a zero tab width lays out as 1.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.tab_width > 0, "tab_width must be at least 1");
        anyhow::ensure!(
            self.wrap_mode == WrapMode::NoWrap
                || self.characters_per_line > self.continuation_indent,
            "characters_per_line ({}) must exceed continuation_indent ({})",
            self.characters_per_line,
            self.continuation_indent
        );
        Ok(())
    }

    /// Line width limit, `None` when wrapping is off.
    pub(crate) fn wrap_width(&self) -> Option<usize> {
        match self.wrap_mode {
            WrapMode::NoWrap => None,
            _ => Some(self.characters_per_line.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_empty_config() {
        let tmp_dir = tempdir().unwrap();
        let config_path = tmp_dir.path().join("layout.toml");
        std::fs::write(&config_path, "").unwrap();

        let config = LayoutConfig::load(&config_path).unwrap();
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn loads_partial_config() {
        let tmp_dir = tempdir().unwrap();
        let config_path = tmp_dir.path().join("layout.toml");
        std::fs::write(
            &config_path,
            "# narrow\nwrap_mode = \"anywhere\"\ncharacters_per_line = 20\n",
        )
        .unwrap();

        let config = LayoutConfig::load(&config_path).unwrap();
        assert_eq!(config.wrap_mode, WrapMode::Anywhere);
        assert_eq!(config.characters_per_line, 20);
        assert_eq!(config.tab_width, 4);
    }

    #[test]
    fn errors_on_unknown_key() {
        let tmp_dir = tempdir().unwrap();
        let config_path = tmp_dir.path().join("layout.toml");
        std::fs::write(&config_path, "font = \"Courier\"\n").unwrap();

        let result = LayoutConfig::load(&config_path);
        assert!(result.unwrap_err().to_string().contains("Failed to parse"));
    }

    #[test]
    fn errors_on_nonexistent_file() {
        let tmp_dir = tempdir().unwrap();
        let config_path = tmp_dir.path().join("nonexistent.toml");

        let result = LayoutConfig::load(&config_path);
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }

    #[test]
    fn rejects_indent_wider_than_line() {
        let tmp_dir = tempdir().unwrap();
        let config_path = tmp_dir.path().join("layout.toml");
        std::fs::write(&config_path, "characters_per_line = 4\ncontinuation_indent = 4\n").unwrap();
        assert!(LayoutConfig::load(&config_path).is_err());
    }

    #[test]
    fn cli_override_wins() {
        let tmp_dir = tempdir().unwrap();
        let cli = tmp_dir.path().join("cli.toml");
        let discovered = tmp_dir.path().join("found.toml");
        std::fs::write(&cli, "tab_width = 2\n").unwrap();
        std::fs::write(&discovered, "tab_width = 8\n").unwrap();

        let config = LayoutConfig::load_with_overrides(Some(&cli), Some(&discovered)).unwrap();
        assert_eq!(config.tab_width, 2);
        let config = LayoutConfig::load_with_overrides(None, Some(&discovered)).unwrap();
        assert_eq!(config.tab_width, 8);
        let config = LayoutConfig::load_with_overrides(None, None).unwrap();
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn wrap_mode_parses_from_cli_names() {
        assert_eq!("none".parse::<WrapMode>().unwrap(), WrapMode::NoWrap);
        assert_eq!("word".parse::<WrapMode>().unwrap(), WrapMode::Word);
        assert!("sideways".parse::<WrapMode>().is_err());
    }
}
