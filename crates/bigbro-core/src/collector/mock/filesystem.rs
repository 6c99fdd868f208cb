//! In-memory mock filesystem for testing providers without real `/proc` or `/sys`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing provider tests to run on any host and in CI.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files, directories and symlinks in memory so tests can simulate
/// `/proc` and `/sys` states without a Linux host.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Map from link path to link target.
    links: HashMap<PathBuf, PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symbolic link pointing at `target`.
    pub fn add_link(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.links.insert(path, target.as_ref().to_path_buf());
    }

    /// Adds a process with the `/proc/[pid]/` entries the process provider reads.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `name` - Value of the `Name:` field in `status`
    /// * `exe` - Target of the `exe` link; pass `""` to simulate a kernel
    ///   thread or a permission-denied link
    /// * `ppid` - Parent process ID
    /// * `tids` - Thread IDs listed under `task/`
    pub fn add_process(&mut self, pid: u32, name: &str, exe: &str, ppid: u32, tids: &[u32]) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(
            base.join("status"),
            format!(
                "Name:\t{}\nState:\tS (sleeping)\nPid:\t{}\nPPid:\t{}\nThreads:\t{}\n",
                name,
                pid,
                ppid,
                tids.len()
            ),
        );
        if exe.is_empty() {
            self.add_file(base.join("cmdline"), "");
        } else {
            self.add_link(base.join("exe"), exe);
            self.add_file(base.join("cmdline"), format!("{}\0", exe));
        }
        self.add_dir(base.join("task"));
        for tid in tids {
            self.add_dir(base.join("task").join(tid.to_string()));
        }
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.directories.contains(path)
            || self.links.contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let children = self
            .files
            .keys()
            .chain(self.directories.iter())
            .chain(self.links.keys())
            .filter(|p| p.parent().is_some_and(|parent| parent == path) && *p != path)
            .cloned()
            .collect::<HashSet<_>>();

        Ok(children.into_iter().collect())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.links.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {:?}", path),
            )
        })
    }
}
