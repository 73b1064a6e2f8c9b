//! Integration tests for loading and resolving tasks from disk

mod common;

use common::{argv, create_project, write_file};
use monora::config::{load_tasks, FsLoader, LoadOptions};
use monora::error::ConfigError;
use monora::{resolve, CommandShape, Forwarding, Generator, Resolution, TaskMap};

fn loader() -> FsLoader {
    FsLoader::with_search_paths(vec![])
}

fn commands(resolution: Resolution) -> Vec<String> {
    match resolution {
        Resolution::Commands(commands) => commands,
        Resolution::Listing(_) => panic!("expected commands"),
    }
}

#[test]
fn test_manifest_scripts_with_hooks() {
    let project = create_project(
        r#"{
            "name": "demo",
            "scripts": {
                "pretest": "eslint src",
                "test": "nyc asia",
                "posttest": "echo done"
            }
        }"#,
    );

    let tasks = load_tasks(&LoadOptions::new(project.path()), &loader()).unwrap();
    let result = resolve(&tasks, &argv(&["test", "--bail"]), Forwarding::Broadcast).unwrap();

    assert_eq!(
        commands(result),
        vec!["eslint src --bail", "nyc asia --bail", "echo done --bail"]
    );
}

#[test]
fn test_local_config_overrides_manifest() {
    let project = create_project(
        r#"{
            "scripts": { "lint": "eslint .", "build": "tsc" },
            "monora": { "lint": "eslint src" }
        }"#,
    );
    write_file(
        project.path(),
        "scripts.config.yml",
        r#"
build: [tsc -p ., rollup -c]
docs:
  - docks --outfile .verb.md
  - verb
"#,
    );

    let tasks = load_tasks(&LoadOptions::new(project.path()), &loader()).unwrap();

    assert_eq!(tasks["lint"], CommandShape::literal("eslint src"));
    let build = resolve(&tasks, &argv(&["build"]), Forwarding::Broadcast).unwrap();
    assert_eq!(commands(build), vec!["tsc -p .", "rollup -c"]);
    let docs = resolve(&tasks, &argv(&["docs"]), Forwarding::Last).unwrap();
    assert_eq!(commands(docs), vec!["docks --outfile .verb.md", "verb"]);
}

#[test]
fn test_relative_preset_overrides_local_tasks() {
    let project = create_project(r#"{ "scripts": { "extends": "./presets/base" } }"#);
    write_file(project.path(), "scripts.config.yml", "lint: local lint\ntest: jest\n");
    write_file(project.path(), "presets/base.yml", "lint: preset lint\nrelease: np\n");

    let tasks = load_tasks(&LoadOptions::new(project.path()), &loader()).unwrap();

    assert_eq!(tasks["lint"], CommandShape::literal("preset lint"));
    assert_eq!(tasks["test"], CommandShape::literal("jest"));
    assert_eq!(tasks["release"], CommandShape::literal("np"));
}

#[test]
fn test_bare_preset_from_search_path() {
    let project = create_project(r#"{ "monora": { "preset": "shared" } }"#);
    let presets = tempfile::TempDir::new().unwrap();
    write_file(presets.path(), "shared.yaml", "fmt: cargo fmt\n");

    let loader = FsLoader::with_search_paths(vec![presets.path().to_path_buf()]);
    let tasks = load_tasks(&LoadOptions::new(project.path()), &loader).unwrap();

    assert_eq!(tasks["fmt"], CommandShape::literal("cargo fmt"));
}

#[test]
fn test_missing_preset_fails() {
    let project = create_project(r#"{ "scripts": { "extends": "./nope" } }"#);
    let result = load_tasks(&LoadOptions::new(project.path()), &loader());
    assert!(matches!(result, Err(ConfigError::PresetUnresolved { .. })));
}

#[test]
fn test_missing_manifest_fails() {
    let project = tempfile::TempDir::new().unwrap();
    let result = load_tasks(&LoadOptions::new(project.path()), &loader());
    assert!(matches!(result, Err(ConfigError::Manifest { .. })));
}

#[test]
fn test_inline_tasks_between_manifest_and_local_config() {
    let project = create_project(r#"{ "scripts": { "a": "manifest", "b": "manifest" } }"#);
    write_file(project.path(), "yarn.scripts.yml", "b: local\n");

    let mut inline = TaskMap::new();
    inline.insert("a".to_string(), CommandShape::literal("inline"));
    inline.insert("b".to_string(), CommandShape::literal("inline"));
    inline.insert(
        "stamp".to_string(),
        CommandShape::Generator(Generator::new("stamp", |tasks, args| {
            Ok(Some(CommandShape::literal(format!(
                "echo {} {}",
                tasks.len(),
                args.join(",")
            ))))
        })),
    );

    let options = LoadOptions::new(project.path()).with_tasks(inline);
    let tasks = load_tasks(&options, &loader()).unwrap();

    assert_eq!(tasks["a"], CommandShape::literal("inline"));
    assert_eq!(tasks["b"], CommandShape::literal("local"));

    let result = resolve(&tasks, &argv(&["stamp", "x", "y"]), Forwarding::Off).unwrap();
    assert_eq!(commands(result), vec!["echo 3 x,y"]);
}

#[test]
fn test_shell_generator_from_config_file() {
    let project = create_project("{}");
    write_file(
        project.path(),
        "scripts.config.yml",
        r#"
each:
  generate: for f in "$@"; do echo "prettier --write $f"; done
quiet:
  generate: "true"
"#,
    );

    let tasks = load_tasks(&LoadOptions::new(project.path()), &loader()).unwrap();

    let result = resolve(&tasks, &argv(&["each", "a.js", "b.js"]), Forwarding::Off).unwrap();
    assert_eq!(
        commands(result),
        vec!["prettier --write a.js", "prettier --write b.js"]
    );

    let result = resolve(&tasks, &argv(&["quiet"]), Forwarding::Broadcast).unwrap();
    assert!(commands(result).is_empty());
}

#[test]
fn test_listing_returns_mapping() {
    let project = create_project(r#"{ "scripts": { "build": "tsc", "start": "node ." } }"#);
    let tasks = load_tasks(&LoadOptions::new(project.path()), &loader()).unwrap();

    match resolve(&tasks, &[], Forwarding::Broadcast).unwrap() {
        Resolution::Listing(listed) => {
            assert_eq!(listed, tasks);
            assert_eq!(monora::runner::listable_names(&listed), vec!["build"]);
        }
        Resolution::Commands(_) => panic!("expected listing"),
    }
}
