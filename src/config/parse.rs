//! Local configuration discovery

use crate::config::loader::ModuleLoader;
use crate::config::types::TaskMap;
use std::path::{Path, PathBuf};

/// Package manager assumed when none is configured
pub const DEFAULT_MANAGER: &str = "yarn";

/// Config file name shared by every package manager
const CONFIG_STEM: &str = "scripts.config";

/// Extensions a local config file may use, in order of preference
const CONFIG_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// How many directories above the working directory are searched
const PARENT_LEVELS: usize = 2;

/// List the local config files to try, in order.
///
/// For the working directory and its two nearest ancestors: `scripts.config.*`
/// first, then `<manager>.scripts.*`.
pub fn config_candidates(cwd: &Path, manager: &str) -> Vec<PathBuf> {
    let stems = [CONFIG_STEM.to_string(), format!("{}.scripts", manager)];
    let mut candidates = Vec::new();

    for dir in cwd.ancestors().take(PARENT_LEVELS + 1) {
        for stem in &stems {
            for ext in CONFIG_EXTENSIONS {
                candidates.push(dir.join(format!("{}.{}", stem, ext)));
            }
        }
    }

    candidates
}

/// Load the first local config file that succeeds.
///
/// Missing or broken candidates are skipped; `None` means nothing loaded.
pub fn find_local_config(
    cwd: &Path,
    manager: &str,
    loader: &dyn ModuleLoader,
) -> Option<(TaskMap, PathBuf)> {
    for candidate in config_candidates(cwd, manager) {
        let identifier = candidate.to_string_lossy();
        match loader.load_module(&identifier) {
            Ok(tasks) => {
                tracing::debug!(path = %candidate.display(), "loaded local config");
                return Some((tasks, candidate));
            }
            Err(err) => {
                tracing::trace!(
                    path = %candidate.display(),
                    error = %err,
                    "skipping config candidate"
                );
            }
        }
    }

    tracing::debug!(cwd = %cwd.display(), "no local config found");
    None
}

/// Load the local config layer, empty when no candidate loads
pub fn load_local_config(cwd: &Path, manager: &str, loader: &dyn ModuleLoader) -> TaskMap {
    find_local_config(cwd, manager, loader)
        .map(|(tasks, _)| tasks)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::FsLoader;
    use crate::config::types::CommandShape;
    use std::fs;
    use tempfile::TempDir;

    fn loader() -> FsLoader {
        FsLoader::with_search_paths(vec![])
    }

    #[test]
    fn test_candidate_order() {
        let candidates = config_candidates(Path::new("/repo/packages/app"), "npm");

        assert_eq!(candidates[0], PathBuf::from("/repo/packages/app/scripts.config.yml"));
        assert_eq!(candidates[3], PathBuf::from("/repo/packages/app/npm.scripts.yml"));
        assert_eq!(candidates[6], PathBuf::from("/repo/packages/scripts.config.yml"));
        assert_eq!(candidates[12], PathBuf::from("/repo/scripts.config.yml"));
        assert_eq!(candidates.len(), 18);
    }

    #[test]
    fn test_candidates_stop_at_root() {
        let candidates = config_candidates(Path::new("/"), DEFAULT_MANAGER);
        assert_eq!(candidates.len(), 6);
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("scripts.config.yml");
        fs::write(&config_path, "test: cargo test\n").unwrap();

        let (tasks, found) = find_local_config(temp_dir.path(), "yarn", &loader()).unwrap();
        assert_eq!(found, config_path);
        assert_eq!(tasks["test"], CommandShape::literal("cargo test"));
    }

    #[test]
    fn test_scripts_config_wins_over_manager_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("scripts.config.yml"), "a: one\n").unwrap();
        fs::write(temp_dir.path().join("yarn.scripts.yml"), "a: two\n").unwrap();

        let tasks = load_local_config(temp_dir.path(), "yarn", &loader());
        assert_eq!(tasks["a"], CommandShape::literal("one"));
    }

    #[test]
    fn test_manager_file_is_used() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pnpm.scripts.yaml"), "a: pnpm\n").unwrap();

        let tasks = load_local_config(temp_dir.path(), "pnpm", &loader());
        assert_eq!(tasks["a"], CommandShape::literal("pnpm"));

        let tasks = load_local_config(temp_dir.path(), "yarn", &loader());
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_find_config_two_levels_up() {
        let temp_dir = TempDir::new().unwrap();
        let package_dir = temp_dir.path().join("packages").join("app");
        fs::create_dir_all(&package_dir).unwrap();
        fs::write(temp_dir.path().join("scripts.config.yml"), "root: echo root\n").unwrap();

        let (_, found) = find_local_config(&package_dir, "yarn", &loader()).unwrap();
        assert_eq!(found, temp_dir.path().join("scripts.config.yml"));
    }

    #[test]
    fn test_broken_candidate_falls_through() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("scripts.config.yml"), "a: [oops\n").unwrap();
        fs::write(temp_dir.path().join("yarn.scripts.yml"), "a: fine\n").unwrap();

        let tasks = load_local_config(temp_dir.path(), "yarn", &loader());
        assert_eq!(tasks["a"], CommandShape::literal("fine"));
    }

    #[test]
    fn test_no_config_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();

        assert!(find_local_config(&nested, "yarn", &loader()).is_none());
        assert!(load_local_config(&nested, "yarn", &loader()).is_empty());
    }
}
