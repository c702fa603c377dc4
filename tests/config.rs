mod common;

use std::path::{Path, PathBuf};

use common::create_workspace;
use phpantom_core::config::{Config, PROJECT_CONFIG_FILE};

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.indexing.extensions, vec!["php"]);
    assert!(config.indexing.exclude.is_empty());
    assert_eq!(config.resolution.max_depth, 32);
    assert!(config.linting.unknown_members);
}

/// Missing sections and keys keep their defaults.
#[test]
fn test_partial_toml() {
    let config = Config::from_toml(concat!(
        "[resolution]\n",
        "max_depth = 8\n",
        "\n",
        "[linting]\n",
        "unknown_members = false\n",
    ))
    .expect("valid toml");

    assert_eq!(config.resolution.max_depth, 8);
    assert!(!config.linting.unknown_members);
    assert!(config.linting.unknown_classes);
    assert_eq!(config.indexing.extensions, vec!["php"]);
}

#[test]
fn test_empty_toml_is_default() {
    assert_eq!(Config::from_toml("").expect("valid toml"), Config::default());
}

#[test]
fn test_load_from_project_file() {
    let dir = create_workspace(&[(
        PROJECT_CONFIG_FILE,
        "[indexing]\nextensions = [\"php\", \"inc\"]\nexclude = [\"cache\"]\n",
    )]);

    let config = Config::load(dir.path());
    assert_eq!(config.indexing.extensions, vec!["php", "inc"]);
    assert_eq!(config.indexing.exclude, vec![PathBuf::from("cache")]);
}

/// A malformed project file is ignored rather than fatal.
#[test]
fn test_malformed_file_is_ignored() {
    let dir = create_workspace(&[(PROJECT_CONFIG_FILE, "[indexing\nextensions = 3\n")]);
    assert!(Config::from_toml("[indexing\nextensions = 3\n").is_err());

    let config = Config::load(dir.path());
    assert_ne!(config.indexing.extensions, Vec::<String>::new());
}

#[test]
fn test_is_indexable() {
    let config = Config::from_toml("[indexing]\nextensions = [\".php\", \"INC\"]\n")
        .expect("valid toml");
    assert!(config.is_indexable(Path::new("/src/a.php")));
    assert!(config.is_indexable(Path::new("/src/A.PHP")));
    assert!(config.is_indexable(Path::new("/src/b.inc")));
    assert!(!config.is_indexable(Path::new("/src/c.txt")));
    assert!(!config.is_indexable(Path::new("/src/php")));
}

#[test]
fn test_is_excluded() {
    let mut config = Config::default();
    config.indexing.exclude = vec![PathBuf::from("vendor/bin"), PathBuf::from("cache")];
    let root = Path::new("/project");

    assert!(config.is_excluded(root, Path::new("/project/vendor/bin/tool.php")));
    assert!(config.is_excluded(root, Path::new("/project/cache/a.php")));
    assert!(!config.is_excluded(root, Path::new("/project/vendor/lib/a.php")));
    // Path components must match whole.
    assert!(!config.is_excluded(root, Path::new("/project/cachet/a.php")));
}
