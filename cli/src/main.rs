mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use assembler::{AssembleError, Inputs, Recipe};
use splice::SpliceError;

const SUBCOMMANDS: &[&str] = &["build", "check", "test", "help"];
/// Options whose value is a separate argument.
const VALUE_OPTIONS: &[&str] = &["-o", "--output", "-c", "--category"];

#[derive(Parser)]
#[command(
    name = "docsplice",
    version,
    about = "Replace delimited sections of a text document"
)]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log every step
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble the output document described by a recipe
    Build(BuildArgs),

    /// Locate every block of a recipe without writing anything
    Check(CheckArgs),

    /// Run .splice-test fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Recipe file (TOML)
    recipe: PathBuf,

    /// Write here instead of the recipe's `output`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the document to stdout instead of writing a file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Recipe file (TOML)
    recipe: PathBuf,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .splice-test file or a directory containing them
    path: PathBuf,

    /// Run only fixtures in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse_from(with_implicit_build(std::env::args().collect()));
    init_logging(cli.verbose, cli.quiet);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let exit_code = match cli.command {
        Command::Build(build_args) => do_build(build_args, color_choice),
        Command::Check(check_args) => do_check(check_args, color_choice),
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                0
            } else {
                test_runner::run_tests(&test_args.path, cli.no_color, &test_args.category)
            }
        }
    };
    process::exit(exit_code);
}

/// `docsplice [options] recipe.toml` is shorthand for
/// `docsplice build [options] recipe.toml`.
fn with_implicit_build(mut args: Vec<String>) -> Vec<String> {
    let mut rest = args.iter().skip(1);
    let mut first_positional = None;
    while let Some(arg) = rest.next() {
        if VALUE_OPTIONS.contains(&arg.as_str()) {
            rest.next();
        } else if !arg.starts_with('-') {
            first_positional = Some(arg.as_str());
            break;
        }
    }

    if first_positional.is_some_and(|arg| !SUBCOMMANDS.contains(&arg)) {
        args.insert(1, "build".to_string());
    }
    args
}

/// `RUST_LOG` wins; otherwise the level follows `-q` / `-v`.
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}

fn load(recipe: &Path) -> Result<Inputs, AssembleError> {
    tracing::debug!("loading recipe {}", recipe.display());
    Recipe::load(recipe)?.load_inputs()
}

fn do_build(args: BuildArgs, color_choice: ColorChoice) -> i32 {
    let inputs = match load(&args.recipe) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let assembly = match inputs.assemble() {
        Ok(assembly) => assembly,
        Err(e) => {
            emit_splice_error(&inputs, &e, color_choice);
            return 1;
        }
    };

    if args.stdout {
        print!("{}", assembly.document);
        return 0;
    }

    let Some(output) = args.output.or_else(|| inputs.output.clone()) else {
        eprintln!("error: no output path; set `output` in the recipe or pass --output");
        return 1;
    };

    match assembly.write(&output) {
        Ok(size) => {
            eprintln!(
                "ok: created {} ({} bytes, {} block(s) replaced)",
                output.display(),
                size,
                assembly.blocks.len()
            );
            0
        }
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    }
}

fn do_check(args: CheckArgs, color_choice: ColorChoice) -> i32 {
    let inputs = match load(&args.recipe) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    match inputs.check() {
        Ok(spans) => {
            for span in &spans {
                println!(
                    "{}: lines {}-{}",
                    span.block,
                    inputs.base.line_of(span.start.start),
                    inputs.base.line_of(span.end.start)
                );
            }
            eprintln!(
                "ok: {} block(s) located in {}",
                spans.len(),
                inputs.base_path.display()
            );
            0
        }
        Err(e) => {
            emit_splice_error(&inputs, &e, color_choice);
            1
        }
    }
}

/// Render a substitution error against the base document.
fn emit_splice_error(inputs: &Inputs, error: &SpliceError, color_choice: ColorChoice) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(
        inputs.base_path.display().to_string(),
        inputs.base.as_str().to_string(),
    );

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let diagnostic = error.to_diagnostic(file_id);
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn bare_recipe_means_build() {
        assert_eq!(
            with_implicit_build(args("docsplice splice.toml")),
            args("docsplice build splice.toml")
        );
    }

    #[test]
    fn option_values_are_not_taken_for_the_recipe() {
        let expanded = with_implicit_build(args("docsplice -v -o out.txt splice.toml"));
        assert_eq!(expanded, args("docsplice build -v -o out.txt splice.toml"));

        let cli = Cli::try_parse_from(expanded).unwrap();
        match cli.command {
            Command::Build(build) => {
                assert_eq!(build.recipe, PathBuf::from("splice.toml"));
                assert_eq!(build.output, Some(PathBuf::from("out.txt")));
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn explicit_subcommands_are_left_alone() {
        for line in [
            "docsplice check splice.toml",
            "docsplice -q test fixtures",
            "docsplice --help",
        ] {
            assert_eq!(with_implicit_build(args(line)), args(line));
        }
    }
}
