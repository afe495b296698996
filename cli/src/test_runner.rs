use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use assembler::{AssembleError, BlockEntry};
use splice::{BlockSpec, Document, Payload};

const FIXTURE_SUFFIX: &str = ".splice-test";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureConfig {
    /// Human-readable fixture description.
    #[serde(default)]
    pub description: Option<String>,

    /// Expected substituted document, compared exactly.
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected error; its Display string must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Blocks to replace. Payload files resolve against the fixture's directory.
    #[serde(default, rename = "block")]
    pub blocks: Vec<BlockEntry>,
}

/// Split a fixture into its TOML frontmatter and the base document.
fn parse_fixture(content: &str) -> Result<(FixtureConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let base = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: FixtureConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, base))
}

pub enum FixtureOutcome {
    Pass,
    Fail(String),
}

pub struct FixtureResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: FixtureOutcome,
}

impl FixtureResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(FIXTURE_SUFFIX))
                .unwrap_or("?")
        })
    }
}

fn build_specs(
    blocks: &[BlockEntry],
    base_dir: &Path,
) -> Result<Vec<(BlockSpec, Payload)>, AssembleError> {
    blocks
        .iter()
        .map(|entry| Ok::<_, AssembleError>((entry.to_spec()?, entry.load_payload(base_dir)?)))
        .collect()
}

fn run_fixture(path: &Path) -> FixtureResult {
    let fail = |description: Option<String>, reason: String| FixtureResult {
        path: path.to_path_buf(),
        description,
        outcome: FixtureOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, base) = match parse_fixture(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let specs = match build_specs(&config.blocks, base_dir) {
        Ok(specs) => specs,
        Err(e) => return fail(description, format!("invalid fixture: {}", e)),
    };

    let result = splice::substitute(&Document::from(base), &specs);
    tracing::debug!("fixture {} finished: ok={}", path.display(), result.is_ok());

    let reason = match (&config.expect_error, &config.expect_output, result) {
        (Some(expected), _, Err(e)) => {
            let message = e.to_string();
            (!message.contains(expected.as_str())).then(|| {
                format!(
                    "expected error containing \"{}\", got: {}",
                    expected, message
                )
            })
        }
        (Some(expected), _, Ok(_)) => Some(format!(
            "expected error containing \"{}\", but substitution succeeded",
            expected
        )),
        (None, _, Err(e)) => Some(format!("unexpected error: {}", e)),
        (None, Some(expected), Ok(document)) => (document.as_str() != expected).then(|| {
            format!(
                "output mismatch\n--- expected ---\n{}\n--- actual ---\n{}",
                expected, document
            )
        }),
        (None, None, Ok(_)) => None,
    };

    match reason {
        Some(reason) => fail(description, reason),
        None => FixtureResult {
            path: path.to_path_buf(),
            description,
            outcome: FixtureOutcome::Pass,
        },
    }
}

/// Discover fixtures grouped by category (subfolder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_fixtures(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_fixtures(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::warn!("cannot read directory {}", dir.display());
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_fixtures(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(FIXTURE_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given fixture path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} fixtures)", label, files.len());
    }
}

fn paint(s: &str, code: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, s)
    }
}

/// Keep only the requested categories (and their subfolders).
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.as_str(), files);
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

/// Run every fixture under `path` (or a single file).
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let all_categories = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };

    if all_categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return 1;
    }

    let run_categories = if path.is_file() {
        select_categories(&all_categories, &[])
    } else {
        select_categories(&all_categories, categories)
    };
    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<FixtureResult> = Vec::new();

    for (cat, files) in &run_categories {
        let header = if cat.is_empty() { "(root)" } else { *cat };
        eprintln!();
        eprintln!("{}", paint(header, "1", no_color));

        for file in *files {
            let result = run_fixture(file);
            match &result.outcome {
                FixtureOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), result.label());
                }
                FixtureOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let FixtureOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", "32", no_color),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}
