//! Module loading
//!
//! Every configuration source (manifest, local config file, preset) is read
//! through a [`ModuleLoader`], so the aggregation logic never touches the
//! filesystem directly.

use crate::config::types::{into_task_map, Manifest, RawManifest, RawTaskMap, TaskMap};
use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Environment variable listing extra preset directories
pub const PRESET_PATH_ENV: &str = "MONORA_PRESET_PATH";

/// Extensions tried when an identifier does not name a file directly
const MODULE_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// Presets kept inside a project, relative to its root
const PROJECT_PRESET_DIR: &str = ".monora/presets";

/// Directory installed packages live in
const PACKAGE_DIR: &str = "node_modules";

/// File stem used when an identifier names a directory
const INDEX_STEM: &str = "index";

/// Capability to load task mappings and manifests
pub trait ModuleLoader {
    /// Load the task mapping exported by a module.
    ///
    /// `identifier` is either a path or a bare module name.
    fn load_module(&self, identifier: &str) -> ConfigResult<TaskMap>;

    /// Load the task fields of a package manifest
    fn load_manifest(&self, path: &Path) -> ConfigResult<Manifest>;
}

/// Loads modules from disk
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    /// Directories searched for bare identifiers, in order
    pub search_paths: Vec<PathBuf>,
}

impl FsLoader {
    /// Create a loader searching `MONORA_PRESET_PATH` and the user preset directory
    pub fn new() -> Self {
        let mut search_paths = env_search_paths();
        search_paths.extend(user_preset_dir());
        FsLoader { search_paths }
    }

    /// Create a loader that also finds presets shipped with the project at `cwd`.
    ///
    /// Search order: `MONORA_PRESET_PATH`, `<cwd>/.monora/presets`, every
    /// `node_modules` from `cwd` up to the root, then the user preset directory.
    pub fn for_project(cwd: &Path) -> Self {
        let mut search_paths = env_search_paths();
        search_paths.push(cwd.join(PROJECT_PRESET_DIR));
        search_paths.extend(
            cwd.ancestors()
                .map(|dir| dir.join(PACKAGE_DIR))
                .filter(|dir| dir.is_dir()),
        );
        search_paths.extend(user_preset_dir());
        FsLoader { search_paths }
    }

    /// Create a loader with explicit search paths
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        FsLoader { search_paths }
    }

    /// Find the file a module identifier refers to.
    ///
    /// Absolute identifiers and ones starting with `./` or `../` are paths;
    /// anything else is looked up in the search paths.
    pub fn locate(&self, identifier: &str) -> ConfigResult<PathBuf> {
        let path = Path::new(identifier);

        let found = if is_path_like(path) {
            find_module_file(path)
        } else {
            self.search_paths
                .iter()
                .find_map(|dir| find_module_file(&dir.join(path)))
        };

        found.ok_or_else(|| ConfigError::NotFound(identifier.to_string()))
    }
}

fn env_search_paths() -> Vec<PathBuf> {
    env::var_os(PRESET_PATH_ENV)
        .map(|paths| env::split_paths(&paths).collect())
        .unwrap_or_default()
}

fn user_preset_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "monora").map(|dirs| dirs.config_dir().join("presets"))
}

fn is_path_like(path: &Path) -> bool {
    path.is_absolute()
        || matches!(
            path.components().next(),
            Some(Component::CurDir | Component::ParentDir)
        )
}

impl ModuleLoader for FsLoader {
    fn load_module(&self, identifier: &str) -> ConfigResult<TaskMap> {
        let path = self.locate(identifier)?;
        tracing::debug!(module = identifier, path = %path.display(), "loading module");
        parse_module_file(&path)
    }

    fn load_manifest(&self, path: &Path) -> ConfigResult<Manifest> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Manifest {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let parsed = match extension(path) {
            "yml" | "yaml" => {
                serde_yaml::from_str::<RawManifest>(&contents).map_err(|e| e.to_string())
            }
            _ => serde_json::from_str::<RawManifest>(&contents).map_err(|e| e.to_string()),
        };

        let raw = parsed.map_err(|error| ConfigError::Manifest {
            path: path.to_path_buf(),
            error,
        })?;

        Ok(raw.into_manifest(base_dir(path)))
    }
}

/// Parse a task mapping file, choosing the format from its extension
pub fn parse_module_file(path: &Path) -> ConfigResult<TaskMap> {
    let identifier = path.display().to_string();
    let load_error = |error: String| ConfigError::Load {
        identifier: identifier.clone(),
        error,
    };

    let contents = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    parse_module(&contents, extension(path), base_dir(path)).map_err(load_error)
}

/// Parse task mapping text in the given format (`json`, otherwise YAML)
pub fn parse_module(contents: &str, format: &str, base_dir: &Path) -> Result<TaskMap, String> {
    if contents.trim().is_empty() {
        return Ok(TaskMap::new());
    }

    let raw: Option<RawTaskMap> = if format == "json" {
        serde_json::from_str(contents).map_err(|e| e.to_string())?
    } else {
        serde_yaml::from_str(contents).map_err(|e| e.to_string())?
    };

    Ok(into_task_map(raw.unwrap_or_default(), base_dir))
}

/// Try `path` as given, then with each module extension appended, then as a
/// directory holding an `index` module
fn find_module_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    if let Some(found) = with_extensions(path) {
        return Some(found);
    }

    if path.is_dir() {
        with_extensions(&path.join(INDEX_STEM))
    } else {
        None
    }
}

fn with_extensions(path: &Path) -> Option<PathBuf> {
    MODULE_EXTENSIONS.iter().find_map(|ext| {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        candidate.is_file().then_some(candidate)
    })
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Serves modules and manifests from memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    modules: HashMap<String, TaskMap>,
    manifests: HashMap<PathBuf, Manifest>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under an identifier
    pub fn with_module(mut self, identifier: impl Into<String>, tasks: TaskMap) -> Self {
        self.modules.insert(identifier.into(), tasks);
        self
    }

    /// Register a manifest under a path
    pub fn with_manifest(mut self, path: impl Into<PathBuf>, manifest: Manifest) -> Self {
        self.manifests.insert(path.into(), manifest);
        self
    }
}

impl ModuleLoader for MemoryLoader {
    fn load_module(&self, identifier: &str) -> ConfigResult<TaskMap> {
        self.modules
            .get(identifier)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(identifier.to_string()))
    }

    fn load_manifest(&self, path: &Path) -> ConfigResult<Manifest> {
        self.manifests
            .get(path)
            .cloned()
            .ok_or_else(|| ConfigError::Manifest {
                path: path.to_path_buf(),
                error: "no such manifest".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::CommandShape;
    use tempfile::TempDir;

    #[test]
    fn test_load_yaml_module_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preset.yml");
        fs::write(&path, "lint: eslint .\n").unwrap();

        let loader = FsLoader::with_search_paths(vec![]);
        let tasks = loader.load_module(path.to_str().unwrap()).unwrap();
        assert_eq!(tasks["lint"], CommandShape::literal("eslint ."));
    }

    #[test]
    fn test_load_module_appends_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("base.json"), r#"{"test": "jest"}"#).unwrap();

        let loader = FsLoader::with_search_paths(vec![]);
        let identifier = temp_dir.path().join("base");
        let tasks = loader.load_module(identifier.to_str().unwrap()).unwrap();
        assert_eq!(tasks["test"], CommandShape::literal("jest"));
    }

    #[test]
    fn test_bare_identifier_uses_search_paths() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("shared.yaml"), "build: make\n").unwrap();

        let loader = FsLoader::with_search_paths(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let tasks = loader.load_module("shared").unwrap();
        assert_eq!(tasks["build"], CommandShape::literal("make"));
    }

    #[test]
    fn test_relative_identifier_is_a_path() {
        let temp_dir = TempDir::new().unwrap();
        let search = temp_dir.path().join("search");
        fs::create_dir_all(&search).unwrap();
        fs::write(search.join("base.yml"), "lint: from search path\n").unwrap();

        let loader = FsLoader::with_search_paths(vec![search]);
        assert!(matches!(
            loader.locate("./base"),
            Err(ConfigError::NotFound(_))
        ));
        assert!(loader.locate("base").is_ok());
    }

    #[test]
    fn test_project_presets_are_searched() {
        let temp_dir = TempDir::new().unwrap();
        let app = temp_dir.path().join("packages").join("app");
        fs::create_dir_all(app.join(".monora/presets")).unwrap();
        fs::write(app.join(".monora/presets/local.yml"), "a: local\n").unwrap();

        let package = temp_dir.path().join("node_modules/@acme/preset");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("index.json"), r#"{"release": "np"}"#).unwrap();

        let loader = FsLoader::for_project(&app);
        assert!(loader.search_paths.contains(&app.join(".monora/presets")));

        let tasks = loader.load_module("local").unwrap();
        assert_eq!(tasks["a"], CommandShape::literal("local"));

        let tasks = loader.load_module("@acme/preset").unwrap();
        assert_eq!(tasks["release"], CommandShape::literal("np"));
    }

    #[test]
    fn test_missing_module_is_not_found() {
        let loader = FsLoader::with_search_paths(vec![]);
        let result = loader.load_module("nowhere");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_module_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.yml");
        fs::write(&path, "build: [unclosed\n").unwrap();

        let result = parse_module_file(&path);
        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }

    #[test]
    fn test_empty_module_is_empty_map() {
        let tasks = parse_module("", "yml", Path::new(".")).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_missing_manifest_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let loader = FsLoader::with_search_paths(vec![]);
        let result = loader.load_manifest(&temp_dir.path().join("package.json"));
        assert!(matches!(result, Err(ConfigError::Manifest { .. })));
    }

    #[test]
    fn test_memory_loader() {
        let mut tasks = TaskMap::new();
        tasks.insert("a".to_string(), CommandShape::literal("echo a"));
        let loader = MemoryLoader::new().with_module("preset-a", tasks.clone());

        assert_eq!(loader.load_module("preset-a").unwrap(), tasks);
        assert!(loader.load_module("preset-b").is_err());
    }
}
