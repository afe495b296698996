use std::io::Write;
use std::path::{Path, PathBuf};

use splice::{BlockSpan, BlockSpec, Document, Payload, SpliceError, Substitutor};

use crate::error::{AssembleError, Result};
use crate::recipe::Recipe;

/// Everything a recipe names, read into memory.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub base_path: PathBuf,
    pub base: Document,
    pub blocks: Vec<(BlockSpec, Payload)>,
    pub output: Option<PathBuf>,
}

impl Recipe {
    /// Read the base document and every payload.
    pub fn load_inputs(&self) -> Result<Inputs> {
        let base_path = self.base_path();
        tracing::info!("reading base document {}", base_path.display());
        let base = std::fs::read_to_string(&base_path)
            .map_err(|e| AssembleError::io(&base_path, e))?;

        let mut blocks = Vec::with_capacity(self.blocks().len());
        for entry in self.blocks() {
            let spec = entry.to_spec()?;
            let payload = entry.load_payload(self.base_dir())?;
            blocks.push((spec, payload));
        }

        Ok(Inputs {
            base_path,
            base: Document::from(base),
            blocks,
            output: self.output_path(),
        })
    }
}

impl Inputs {
    /// Locate every block without substituting anything.
    pub fn check(&self) -> std::result::Result<Vec<BlockSpan>, SpliceError> {
        Substitutor::new(&self.base).locate_all(self.blocks.iter().map(|(spec, _)| spec))
    }

    /// Replace every block body. Nothing is written.
    pub fn assemble(&self) -> std::result::Result<Assembly, SpliceError> {
        let (document, spans) = Substitutor::new(&self.base).apply_with_spans(&self.blocks)?;

        let blocks = spans
            .iter()
            .zip(&self.blocks)
            .map(|(span, (_, payload))| {
                let old_body = self.base.slice(span.body.clone());
                let report = BlockReport {
                    name: span.block.clone(),
                    line: self.base.line_of(span.start.start),
                    old_bytes: old_body.len(),
                    new_bytes: payload.len(),
                    old_lines: old_body.lines().count(),
                    new_lines: payload.line_count(),
                };
                tracing::info!(
                    "replaced `{}` at line {} ({} -> {} lines)",
                    report.name,
                    report.line,
                    report.old_lines,
                    report.new_lines
                );
                report
            })
            .collect();

        Ok(Assembly { document, blocks })
    }
}

/// Summary of one replaced block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    pub name: String,
    /// 1-based line of the start marker in the base document.
    pub line: usize,
    pub old_bytes: usize,
    pub new_bytes: usize,
    pub old_lines: usize,
    pub new_lines: usize,
}

/// A fully substituted document, not yet persisted.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub document: Document,
    pub blocks: Vec<BlockReport>,
}

impl Assembly {
    /// Write the document to `path` and return the number of bytes written.
    ///
    /// The text goes to a uniquely named temporary file in the same directory,
    /// which is then renamed over `path`. An interrupted write never leaves a
    /// truncated output, and the temporary file is removed on any failure.
    pub fn write(&self, path: &Path) -> Result<u64> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| AssembleError::io(dir, e))?;
        tmp.write_all(self.document.as_str().as_bytes())
            .map_err(|e| AssembleError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| AssembleError::io(path, e.error))?;

        let size = std::fs::metadata(path)
            .map_err(|e| AssembleError::io(path, e))?
            .len();
        tracing::info!("wrote {} ({} bytes)", path.display(), size);
        Ok(size)
    }
}
