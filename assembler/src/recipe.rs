use std::path::{Path, PathBuf};

use serde::Deserialize;
use splice::{BlockSpec, Payload};

use crate::error::{AssembleError, Result};

/// One `[[block]]` table of a recipe.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockEntry {
    /// Name reported in errors and summaries.
    pub name: String,

    /// Literal opener line, e.g. `RUN cat > app.js <<'JSEOF'`.
    #[serde(default)]
    pub start: Option<String>,

    /// Regular expression matching the opener up to the body.
    #[serde(default)]
    pub pattern: Option<String>,

    /// End-marker literal; must be the first token of its own line.
    pub end: String,

    /// File holding the replacement body, relative to the recipe.
    #[serde(default)]
    pub payload: Option<PathBuf>,

    /// Inline replacement body.
    #[serde(default)]
    pub text: Option<String>,

    /// Accept an empty payload.
    #[serde(default)]
    pub allow_empty: bool,
}

impl BlockEntry {
    /// Build the block specification this entry describes.
    pub fn to_spec(&self) -> Result<BlockSpec> {
        let spec = match (&self.start, &self.pattern) {
            (Some(start), None) => BlockSpec::literal(&self.name, start, &self.end),
            (None, Some(pattern)) => BlockSpec::pattern(&self.name, pattern, &self.end),
            (Some(_), Some(_)) => {
                return Err(AssembleError::invalid(format!(
                    "block `{}` sets both `start` and `pattern`",
                    self.name
                )));
            }
            (None, None) => {
                return Err(AssembleError::invalid(format!(
                    "block `{}` needs either `start` or `pattern`",
                    self.name
                )));
            }
        };
        Ok(if self.allow_empty {
            spec.allow_empty()
        } else {
            spec
        })
    }

    /// Read the payload, resolving a `payload` path against `base_dir`.
    pub fn load_payload(&self, base_dir: &Path) -> Result<Payload> {
        match (&self.payload, &self.text) {
            (Some(path), None) => {
                let path = base_dir.join(path);
                let text =
                    std::fs::read_to_string(&path).map_err(|e| AssembleError::io(&path, e))?;
                tracing::debug!("read payload for `{}` from {}", self.name, path.display());
                Ok(Payload::from(text))
            }
            (None, Some(text)) => Ok(Payload::from(text.as_str())),
            (Some(_), Some(_)) => Err(AssembleError::invalid(format!(
                "block `{}` sets both `payload` and `text`",
                self.name
            ))),
            (None, None) => Err(AssembleError::invalid(format!(
                "block `{}` needs either `payload` or `text`",
                self.name
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeFile {
    base: PathBuf,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default, rename = "block")]
    blocks: Vec<BlockEntry>,
}

/// A declarative description of one substitution run: the base document,
/// where to write the result, and the blocks to replace.
#[derive(Debug, Clone)]
pub struct Recipe {
    /// Directory relative paths are resolved against.
    base_dir: PathBuf,
    base: PathBuf,
    output: Option<PathBuf>,
    blocks: Vec<BlockEntry>,
}

impl Recipe {
    /// Load a recipe file. Paths inside it are relative to its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| AssembleError::io(path, e))?;
        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&source, base_dir, path.display().to_string())
    }

    /// Parse recipe TOML with paths relative to `base_dir`.
    pub fn from_toml_str(source: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::parse(source, base_dir.into(), "<inline>".to_string())
    }

    fn parse(source: &str, base_dir: PathBuf, origin: String) -> Result<Self> {
        let file: RecipeFile =
            toml::from_str(source).map_err(|source| AssembleError::Recipe { origin, source })?;

        if file.blocks.is_empty() {
            return Err(AssembleError::invalid("recipe declares no blocks"));
        }
        for entry in &file.blocks {
            entry.to_spec()?;
            if entry.payload.is_some() == entry.text.is_some() {
                return Err(AssembleError::invalid(format!(
                    "block `{}` needs exactly one of `payload` or `text`",
                    entry.name
                )));
            }
        }

        Ok(Recipe {
            base_dir,
            base: file.base,
            output: file.output,
            blocks: file.blocks,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolved path of the base document.
    pub fn base_path(&self) -> PathBuf {
        self.base_dir.join(&self.base)
    }

    /// Resolved output path, if the recipe names one.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output.as_ref().map(|p| self.base_dir.join(p))
    }

    pub fn blocks(&self) -> &[BlockEntry] {
        &self.blocks
    }
}
