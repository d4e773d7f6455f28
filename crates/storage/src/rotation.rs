use std::fs;
use std::path::{Path, PathBuf};
use chrono::Local;
use tracing::{info, warn};

/// Move `path` aside to `<path>.<timestamp>` once it has grown past `max_bytes`.
pub fn rotate_if_needed(path: &Path, max_bytes: u64) -> Option<PathBuf> {
    let meta = fs::metadata(path).ok()?;
    if meta.len() <= max_bytes { return None }
    let ts = Local::now().format("%Y%m%d%H%M%S").to_string();
    let mut rotated = path.as_os_str().to_owned();
    rotated.push(format!(".{ts}"));
    let rotated = PathBuf::from(rotated);
    match fs::rename(path, &rotated) {
        Ok(()) => { info!("rotated {} to {}", path.display(), rotated.display()); Some(rotated) }
        Err(e) => { warn!("could not rotate {}: {e}", path.display()); None }
    }
}

/// Newest `<path>.<timestamp>` left behind by [`rotate_if_needed`].
pub fn latest_rotated(path: &Path) -> Option<PathBuf> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let prefix = format!("{}.", path.file_name()?.to_string_lossy());
    fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(prefix.as_str()))
                .is_some_and(|ts| !ts.is_empty() && ts.chars().all(|c| c.is_ascii_digit()))
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_files_stay_put() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("audit.jsonl");
        fs::write(&path, "a line\n").unwrap();
        assert!(rotate_if_needed(&path, 1024).is_none());
        assert!(path.exists());
        assert!(rotate_if_needed(&tmp.path().join("missing.csv"), 0).is_none());
    }

    #[test]
    fn large_files_move_aside() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("audit.jsonl");
        fs::write(&path, "x".repeat(64)).unwrap();
        let rotated = rotate_if_needed(&path, 16).unwrap();
        assert!(!path.exists());
        assert!(rotated.exists());
        assert!(rotated.to_string_lossy().starts_with(&*path.to_string_lossy()));
        assert_eq!(latest_rotated(&path), Some(rotated));
    }

    #[test]
    fn latest_rotated_picks_newest_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("audit.jsonl");
        for name in ["audit.jsonl.20260101000000", "audit.jsonl.20260301000000", "audit.jsonl.bak", "other.20270101000000"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        assert_eq!(latest_rotated(&path), Some(tmp.path().join("audit.jsonl.20260301000000")));
        assert_eq!(latest_rotated(&tmp.path().join("none.jsonl")), None);
    }
}
