//! Process and thread records as reported by a [`ProcessProvider`].
//!
//! [`ProcessProvider`]: crate::collector::ProcessProvider

/// A single thread, identified by its TID and the PID of the owning process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadInfo {
    pub tid: u32,
    pub owner_pid: u32,
}

impl ThreadInfo {
    pub fn new(tid: u32, owner_pid: u32) -> Self {
        Self { tid, owner_pid }
    }
}

/// A running process with the threads it owns.
///
/// The thread list only ever holds threads whose `owner_pid` equals `pid`;
/// both constructors filter foreign threads out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Executable name, e.g. `app.exe` or `bash`.
    pub name: String,
    /// Full path to the executable.
    pub full_path: String,
    pub pid: u32,
    /// Thread count as reported by the OS (may differ from `threads().len()`
    /// when threads come and go between the two reads).
    pub thread_count: u32,
    pub parent_pid: u32,
    threads: Vec<ThreadInfo>,
}

impl ProcessInfo {
    pub fn new(
        name: impl Into<String>,
        full_path: impl Into<String>,
        pid: u32,
        thread_count: u32,
        parent_pid: u32,
        threads: Vec<ThreadInfo>,
    ) -> Self {
        let mut threads = threads;
        threads.retain(|t| t.owner_pid == pid);
        Self {
            name: name.into(),
            full_path: full_path.into(),
            pid,
            thread_count,
            parent_pid,
            threads,
        }
    }

    /// Builds a process from bare thread IDs, all owned by `pid`.
    pub fn with_thread_ids(
        name: impl Into<String>,
        full_path: impl Into<String>,
        pid: u32,
        thread_count: u32,
        parent_pid: u32,
        tids: &[u32],
    ) -> Self {
        let threads = tids.iter().map(|&tid| ThreadInfo::new(tid, pid)).collect();
        Self::new(name, full_path, pid, thread_count, parent_pid, threads)
    }

    /// Threads owned by this process, in provider order.
    pub fn threads(&self) -> &[ThreadInfo] {
        &self.threads
    }

    /// Renders the multi-line process block.
    ///
    /// Five lines always; a sixth `Thread TIDs:` line when `list_threads` is set.
    pub fn render(&self, list_threads: bool) -> String {
        let mut block = format!(
            "Name: {}\nFull Path: {}\nPID: {}\nThread Count: {}\nParent Process PID: {}",
            self.name, self.full_path, self.pid, self.thread_count, self.parent_pid
        );
        if list_threads {
            let tids: Vec<String> = self.threads.iter().map(|t| t.tid.to_string()).collect();
            block.push_str("\nThread TIDs: ");
            block.push_str(&tids.join(" | "));
        }
        block
    }
}

/// Attaches threads from a system-wide thread list to their owning processes.
///
/// Each process keeps only the threads whose owner PID matches; threads whose
/// owner is not in `processes` are dropped.
pub fn link_threads(processes: &mut [ProcessInfo], all_threads: &[ThreadInfo]) {
    for process in processes.iter_mut() {
        process.threads = all_threads
            .iter()
            .filter(|t| t.owner_pid == process.pid)
            .copied()
            .collect();
    }
}
