use super::errors::{Result, UpdateError};
use super::repo_config::RepoCfg;
use log::debug;
use std::path::Path;

/// Reads the configuration record from `path`.
///
/// Files ending in `.toml` are parsed as TOML, everything else as JSON. Unknown keys
/// are ignored and missing optional keys take their defaults. The returned record has
/// already been validated.
pub fn load_config(path: impl AsRef<Path>) -> Result<RepoCfg> {
    let path = path.as_ref();
    let file_text = std::fs::read_to_string(path).map_err(|source| UpdateError::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let config: RepoCfg = if is_toml {
        toml::from_str(&file_text)?
    } else {
        serde_json::from_str(&file_text)?
    };

    config.validate()?;
    debug!("Loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_json_with_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "gitrepo": "https://example.test/repo.git",
                "folder": "/tmp/x",
                "pre-script": "./pre.sh",
                "interval": 5,
                "comment": "ignored"
            }"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.gitrepo, "https://example.test/repo.git");
        assert_eq!(cfg.folder, Path::new("/tmp/x"));
        assert_eq!(cfg.pre_script(), Some(Path::new("./pre.sh")));
        assert!(cfg.post_script().is_none());
        assert_eq!(cfg.interval, 5);
    }

    #[test]
    fn loads_toml_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "gitrepo = \"https://example.test/repo.git\"\nfolder = \"/srv/app\"\n\"post-script\" = \"./restart.sh\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.folder, Path::new("/srv/app"));
        assert_eq!(cfg.post_script(), Some(Path::new("./restart.sh")));
        assert_eq!(cfg.interval, 86400);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, UpdateError::ConfigRead { .. }));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, UpdateError::Json(_)));
    }

    #[test]
    fn zero_interval_fails_at_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"folder": "/tmp/x", "interval": 0}"#).unwrap();

        assert!(matches!(load_config(&path), Err(UpdateError::InvalidConfig(_))));
    }
}
