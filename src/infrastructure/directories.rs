use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};

use crate::config::DirectoryConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub model_dir: PathBuf,
    pub feedback_path: PathBuf,
}

pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(&cfg.logs_dir)?;
    let data_dir = ensure_dir(&cfg.data_dir)?;
    let feedback_path = data_dir.join(&cfg.feedback_filename);

    // Artifacts come from the training pipeline; never create this one.
    let model_dir = PathBuf::from(&cfg.model_dir);
    if !model_dir.is_dir() {
        bail!("model directory {} does not exist", model_dir.display());
    }
    let model_dir = model_dir.canonicalize().unwrap_or(model_dir);

    let marker = data_dir.join(".write-test");
    fs::write(&marker, b"ok")
        .with_context(|| format!("data directory {} is not writable", data_dir.display()))?;
    fs::remove_file(&marker)?;
    Ok(ResolvedPaths {
        logs_dir,
        model_dir,
        feedback_path,
    })
}

fn ensure_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("failed to create directory {}", path))?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(&dir) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o755);
            let _ = fs::set_permissions(&dir, perms);
        }
    }
    Ok(dir.canonicalize().unwrap_or(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(root: &std::path::Path, model_dir: &str) -> DirectoryConfig {
        DirectoryConfig {
            logs_dir: root.join("logs").display().to_string(),
            data_dir: root.join("data").display().to_string(),
            model_dir: model_dir.to_string(),
            feedback_filename: "feedback.csv".to_string(),
        }
    }

    #[test]
    fn creates_writable_dirs_and_resolves_feedback_path() {
        let root = tempfile::tempdir().unwrap();
        let models = root.path().join("models");
        fs::create_dir(&models).unwrap();

        let paths = ensure_directories(&config_in(root.path(), &models.display().to_string()))
            .unwrap();

        assert!(paths.logs_dir.is_dir());
        let data_dir = paths.feedback_path.parent().unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(data_dir, root.path().join("data").canonicalize().unwrap().as_path());
        assert!(!paths.feedback_path.exists());
        assert!(!data_dir.join(".write-test").exists());
    }

    #[test]
    fn missing_model_dir_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope").display().to_string();

        let err = ensure_directories(&config_in(root.path(), &missing)).unwrap_err();
        assert!(err.to_string().contains("model directory"));
    }
}
