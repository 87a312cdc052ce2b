#![allow(dead_code)]

pub mod temp_files {
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Writes `content` to `name` inside a fresh temporary directory.
    ///
    /// The directory is removed when the returned guard drops.
    pub fn create_temp_manifest(name: &str, content: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    /// Builds a route directory from relative file paths, e.g.
    /// `["layout.tsx", "blog/[slug]/page.tsx"]`.
    pub fn create_app_dir(files: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            add_file(dir.path(), file);
        }
        dir
    }

    /// Adds one file (and its parent directories) under `root`
    pub fn add_file(root: &Path, file: &str) {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, format!("// {file}\n")).unwrap();
    }
}

pub mod polling {
    use std::time::{Duration, Instant};

    /// Polls `check` every 25ms until it returns true or `timeout` elapses
    pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(25));
        }
        check()
    }
}
