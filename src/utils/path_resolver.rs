use anyhow::Result;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "mineops-wizard";
pub const LOCAL_CONFIG_FILE: &str = "mineops.toml";

/// Folder next to the executable (falls back to the working directory).
pub fn resolve_deployment_folder() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return dir.to_path_buf();
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Per-user data folder for this app: `<data_local_dir>/mineops-wizard`, or the
/// deployment folder when the platform has no such directory.
pub fn resolve_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(resolve_deployment_folder)
}

/// Resolve log folder (absolute path), creating it when missing.
pub fn resolve_log_folder(configured: Option<&Path>) -> Result<PathBuf> {
    let dir = match configured {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => resolve_data_folder().join("logs"),
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder {}: {}", dir.display(), e))?;
    Ok(dir)
}

/// File backing the host key-value store.
pub fn resolve_storage_path(configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => resolve_data_folder().join("state.json"),
    }
}

/// Config files probed when `--config` is not given, in priority order.
pub fn config_candidates() -> Vec<PathBuf> {
    let mut out = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        out.push(dir.join(APP_DIR).join("config.toml"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_log_folder_is_created() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let wanted = tmp.path().join("a").join("logs");
        let got = resolve_log_folder(Some(&wanted)).expect("resolve");
        assert_eq!(got, wanted);
        assert!(wanted.is_dir());
    }

    #[test]
    fn empty_configured_path_falls_back_to_data_folder() {
        let p = resolve_storage_path(Some(Path::new("")));
        assert!(p.ends_with("state.json"));
        assert!(p.to_string_lossy().contains(APP_DIR) || p.starts_with(resolve_deployment_folder()));
    }

    #[test]
    fn local_config_is_probed_first() {
        assert_eq!(config_candidates()[0], PathBuf::from(LOCAL_CONFIG_FILE));
    }
}
