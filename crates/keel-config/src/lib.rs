pub mod document;
pub mod error;

pub use document::{
    BucketConfig, Document, GroupConfig, IdentityManagement, ProviderConfig, Storage, UserConfig,
};
pub use error::*;

use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file directly
pub const CONFIG_PATH_ENV: &str = "KEEL_CONFIG_PATH";

const CANDIDATES: [&str; 4] = ["keel.local.yaml", ".keel.local.yaml", "keel.yaml", ".keel.yaml"];

/// Keel's configuration directory, created on demand
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("keel");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the project's configuration file
///
/// Search order:
/// 1. `KEEL_CONFIG_PATH`
/// 2. current directory: keel.local.yaml, .keel.local.yaml, keel.yaml, .keel.yaml
/// 3. `./.keel/` with the same order
/// 4. `~/.config/keel/keel.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at a missing file: {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let keel_dir = current_dir.join(".keel");
    if keel_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = keel_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("keel").join("keel.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Read and validate the document at `path`
pub fn load_document(path: &Path) -> Result<Document> {
    tracing::debug!("Loading configuration from {}", path.display());
    let source = std::fs::read_to_string(path)?;
    match Document::from_yaml(&source) {
        Err(ConfigError::Yaml(source)) => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("keel"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        fs::write(temp_dir.path().join("keel.yaml"), "{}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("keel.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        fs::write(temp_dir.path().join("keel.yaml"), "{}").unwrap();
        fs::write(temp_dir.path().join(".keel.local.yaml"), "{}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".keel.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_keel_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let keel_dir = temp_dir.path().join(".keel");
        fs::create_dir(&keel_dir).unwrap();
        fs::write(keel_dir.join("keel.yaml"), "{}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".keel/keel.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "{}").unwrap();

        let result = temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), find_config_file);
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, None::<&str>),
                ("HOME", Some(temp_dir.path().to_str().unwrap())),
                ("XDG_CONFIG_HOME", Some(temp_dir.path().to_str().unwrap())),
            ],
            find_config_file,
        );
        std::env::set_current_dir(original_dir).unwrap();

        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));
    }

    #[test]
    fn test_load_document_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("keel.yaml");
        fs::write(&path, "identity_management: [not, a, map]").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("keel.yaml"));
    }

    #[test]
    fn test_load_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("keel.yaml");
        fs::write(
            &path,
            "identity_management:\n  groups:\n    - name: ops\n",
        )
        .unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc.definitions().len(), 1);
    }
}
