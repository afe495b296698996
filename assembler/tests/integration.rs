use std::fs;
use std::path::Path;

use assembler::{AssembleError, Recipe};
use splice::SpliceError;

const BASE: &str = "\
FROM python:3.11-slim
RUN mkdir -p $HOME/app/web_ui && cat > $HOME/app/web_ui/index.html <<'HTMLEOF'
<html>old</html>
HTMLEOF
RUN cat > $HOME/app/web_ui/style.css <<'CSSEOF'
body { color: red; }
CSSEOF
RUN cat > $HOME/app/web_ui/app.js <<'JSEOF'
console.log('old');
JSEOF
CMD [\"python\", \"-m\", \"app\"]
";

const RECIPE: &str = r#"
base = "Dockerfile_WEB"
output = "Dockerfile_WEB_ENHANCED"

[[block]]
name = "html"
start = "RUN mkdir -p $HOME/app/web_ui && cat > $HOME/app/web_ui/index.html <<'HTMLEOF'"
end = "HTMLEOF"
payload = "ui/index.html"

[[block]]
name = "css"
pattern = '''^RUN cat > \$HOME/app/web_ui/style\.css <<'CSSEOF'\n'''
end = "CSSEOF"
payload = "ui/style.css"

[[block]]
name = "js"
start = "RUN cat > $HOME/app/web_ui/app.js <<'JSEOF'"
end = "JSEOF"
text = "console.log('inline');"
"#;

fn project(dir: &Path, recipe: &str) -> std::path::PathBuf {
    fs::create_dir_all(dir.join("ui")).unwrap();
    fs::write(dir.join("Dockerfile_WEB"), BASE).unwrap();
    fs::write(dir.join("ui/index.html"), "<html>\n  new\n</html>\n").unwrap();
    fs::write(dir.join("ui/style.css"), "body { color: blue; }\n").unwrap();
    let path = dir.join("splice.toml");
    fs::write(&path, recipe).unwrap();
    path
}

#[test]
fn builds_output_from_recipe() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe::load(&project(dir.path(), RECIPE)).unwrap();

    let inputs = recipe.load_inputs().unwrap();
    let assembly = inputs.assemble().unwrap();
    let output = inputs.output.clone().expect("recipe names an output");
    let size = assembly.write(&output).unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(size, written.len() as u64);
    assert_eq!(
        written,
        BASE.replace("<html>old</html>", "<html>\n  new\n</html>")
            .replace("color: red", "color: blue")
            .replace("'old'", "'inline'")
    );
    assert_eq!(
        file_names(dir.path()),
        ["Dockerfile_WEB", "Dockerfile_WEB_ENHANCED", "splice.toml", "ui"]
    );
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn write_overwrites_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = Recipe::load(&project(dir.path(), RECIPE))
        .unwrap()
        .load_inputs()
        .unwrap();
    let output = dir.path().join("Dockerfile_WEB_ENHANCED");
    fs::write(&output, "previous").unwrap();

    inputs.assemble().unwrap().write(&output).unwrap();
    assert!(fs::read_to_string(&output).unwrap().contains("'inline'"));
    assert_eq!(file_names(dir.path()).len(), 4);
}

#[test]
fn failed_write_leaves_no_temporary_file() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = Recipe::load(&project(dir.path(), RECIPE))
        .unwrap()
        .load_inputs()
        .unwrap();
    let assembly = inputs.assemble().unwrap();

    // A directory cannot be replaced by a file.
    let output = dir.path().join("ui");
    let err = assembly.write(&output).unwrap_err();
    assert!(matches!(err, AssembleError::Io { ref path, .. } if path == &output));
    assert_eq!(file_names(dir.path()), ["Dockerfile_WEB", "splice.toml", "ui"]);
}

#[test]
fn reports_each_block() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe::load(&project(dir.path(), RECIPE)).unwrap();
    let assembly = recipe.load_inputs().unwrap().assemble().unwrap();

    let names: Vec<&str> = assembly.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["html", "css", "js"]);

    let html = &assembly.blocks[0];
    assert_eq!(html.line, 2);
    assert_eq!(html.old_lines, 1);
    assert_eq!(html.new_lines, 3);
}

#[test]
fn check_locates_without_substituting() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = Recipe::load(&project(dir.path(), RECIPE))
        .unwrap()
        .load_inputs()
        .unwrap();

    let spans = inputs.check().unwrap();
    assert_eq!(spans.len(), 3);
    assert_eq!(inputs.base.line_of(spans[2].end.start), 10);
}

#[test]
fn missing_marker_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = RECIPE.replace("<<'JSEOF'\"", "<<'TSEOF'\"");
    let recipe = Recipe::load(&project(dir.path(), &recipe)).unwrap();

    let inputs = recipe.load_inputs().unwrap();
    let err = inputs.assemble().unwrap_err();
    assert_eq!(err.block(), Some("js"));
    assert!(!dir.path().join("Dockerfile_WEB_ENHANCED").exists());
}

#[test]
fn failed_run_keeps_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = project(dir.path(), RECIPE);
    let output = dir.path().join("Dockerfile_WEB_ENHANCED");
    fs::write(&output, "previous").unwrap();

    fs::write(dir.path().join("Dockerfile_WEB"), "FROM scratch\n").unwrap();
    let result = Recipe::load(&path).unwrap().load_inputs().unwrap().assemble();

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
}

#[test]
fn missing_payload_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = project(dir.path(), RECIPE);
    fs::remove_file(dir.path().join("ui/style.css")).unwrap();

    let err = Recipe::load(&path).unwrap().load_inputs().unwrap_err();
    match err {
        AssembleError::Io { path, .. } => assert!(path.ends_with("ui/style.css")),
        other => panic!("expected I/O error, got {other:?}"),
    }
}

#[test]
fn empty_payload_file_is_rejected_unless_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let path = project(dir.path(), RECIPE);
    fs::write(dir.path().join("ui/style.css"), "").unwrap();

    let err = Recipe::load(&path)
        .unwrap()
        .load_inputs()
        .unwrap()
        .assemble()
        .unwrap_err();
    assert!(matches!(err, SpliceError::EmptyInput { .. }));

    let allowed = RECIPE.replace(
        "payload = \"ui/style.css\"",
        "payload = \"ui/style.css\"\nallow_empty = true",
    );
    fs::write(&path, allowed).unwrap();
    let assembly = Recipe::load(&path)
        .unwrap()
        .load_inputs()
        .unwrap()
        .assemble()
        .unwrap();
    assert!(
        assembly
            .document
            .as_str()
            .contains("<<'CSSEOF'\nCSSEOF\n")
    );
}

#[test]
fn paths_are_relative_to_recipe_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("deploy");
    let path = project(&nested, RECIPE);

    let recipe = Recipe::load(&path).unwrap();
    assert_eq!(recipe.base_path(), nested.join("Dockerfile_WEB"));
    assert_eq!(
        recipe.output_path(),
        Some(nested.join("Dockerfile_WEB_ENHANCED"))
    );
    assert!(recipe.load_inputs().is_ok());
}

#[test]
fn rejects_block_with_both_start_forms() {
    let src = r#"
base = "Dockerfile"

[[block]]
name = "x"
start = "RUN a"
pattern = "^RUN a\n"
end = "EOF"
text = "y"
"#;
    let err = Recipe::from_toml_str(src, ".").unwrap_err();
    assert!(err.to_string().contains("both `start` and `pattern`"));
}

#[test]
fn rejects_block_without_payload() {
    let src = r#"
base = "Dockerfile"

[[block]]
name = "x"
start = "RUN a"
end = "EOF"
"#;
    let err = Recipe::from_toml_str(src, ".").unwrap_err();
    assert!(matches!(err, AssembleError::InvalidRecipe(_)));
}

#[test]
fn rejects_recipe_without_blocks() {
    let err = Recipe::from_toml_str("base = \"Dockerfile\"\n", ".").unwrap_err();
    assert!(matches!(err, AssembleError::InvalidRecipe(_)));
}

#[test]
fn rejects_unknown_keys() {
    let src = r#"
base = "Dockerfile"
outptu = "typo"

[[block]]
name = "x"
start = "RUN a"
end = "EOF"
text = "y"
"#;
    let err = Recipe::from_toml_str(src, ".").unwrap_err();
    assert!(matches!(err, AssembleError::Recipe { .. }));
}

#[test]
fn demo_recipe_assembles() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/web-ui/splice.toml");
    let inputs = Recipe::load(&path).unwrap().load_inputs().unwrap();
    let assembly = inputs.assemble().unwrap();

    let text = assembly.document.as_str();
    assert!(text.contains("<nav class=\"tabs\">"));
    assert!(text.contains(".log-entry.error { color: #c00; }\nCSSEOF\n"));
    assert!(text.contains("log.textContent = 'ready';\n});\nJSEOF\n"));
    assert!(text.ends_with("CMD [\"python\", \"-m\", \"http.server\", \"7860\", \"--directory\", \"web_ui\"]\n"));
    assert_eq!(assembly.blocks.len(), 3);
}
