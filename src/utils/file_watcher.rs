use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Watches the configuration layer files and reports when any of them changes
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: UnboundedReceiver<Result<Event, notify::Error>>,
    /// Canonical directory and file name of every watched file
    files: Vec<(PathBuf, OsString)>,
}

impl ConfigWatcher {
    /// Start watching one file
    pub fn new(path: &Path) -> Result<Self> {
        Self::for_files(&[path.to_path_buf()])
    }

    /// Start watching several files with one watcher.
    ///
    /// The parent directories are watched instead of the files themselves so
    /// that editors which save by rename are still picked up. Each directory
    /// must already exist.
    pub fn for_files(paths: &[PathBuf]) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |event| {
            let _ = tx.send(event);
        })?;

        let mut files = Vec::with_capacity(paths.len());
        let mut watched_dirs: Vec<PathBuf> = Vec::new();
        for path in paths {
            let name = path
                .file_name()
                .with_context(|| format!("{} is not a file path", path.display()))?
                .to_os_string();
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let dir = parent
                .canonicalize()
                .with_context(|| format!("Failed to resolve {}", parent.display()))?;

            if !watched_dirs.contains(&dir) {
                watcher
                    .watch(&dir, RecursiveMode::NonRecursive)
                    .with_context(|| format!("Failed to watch {}", dir.display()))?;
                watched_dirs.push(dir.clone());
            }
            files.push((dir, name));
        }

        Ok(Self {
            _watcher: watcher,
            rx,
            files,
        })
    }

    /// Wait for the next change to a watched file.
    ///
    /// Returns `None` once the watcher has shut down.
    pub async fn changed(&mut self) -> Option<()> {
        while let Some(event) = self.rx.recv().await {
            match event {
                Ok(event) if self.is_relevant(&event) => return Some(()),
                Ok(_) => {}
                Err(e) => tracing::warn!("config watcher error: {}", e),
            }
        }
        None
    }

    fn is_relevant(&self, event: &Event) -> bool {
        Self::is_content_change(&event.kind) && event.paths.iter().any(|p| self.watches(p))
    }

    fn watches(&self, path: &Path) -> bool {
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            return false;
        };
        self.files
            .iter()
            .any(|(watched_dir, watched_name)| watched_dir == dir && watched_name == name)
    }

    /// Only creations and data writes count; metadata-only changes are ignored
    pub fn is_content_change(kind: &EventKind) -> bool {
        use notify::event::ModifyKind;
        match kind {
            EventKind::Create(_) => true,
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Name(_)) => true,
            _ => false,
        }
    }
}
