//! Services the settings core borrows from its host: folder and heading
//! listings, and a place to show short messages to the user.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Lists every folder the host knows about, as paths relative to its root
pub trait DirectoryLister {
    fn directories(&self) -> Vec<String>;
}

/// Lists the section headings of a note, in document order
pub trait HeadingLister {
    fn headings(&self, note: &Path) -> Vec<String>;
}

/// Fire-and-forget user-visible messages
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Folders and markdown notes under a directory on disk
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(&self, dir: &Path, out: &mut Vec<String>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "cannot list directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            // file_type does not follow symlinks, so linked folders cannot loop
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            if hidden || !is_dir {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(&self.root) {
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
            self.walk(&path, out);
        }
    }
}

impl DirectoryLister for FsVault {
    fn directories(&self) -> Vec<String> {
        let mut dirs = Vec::new();
        self.walk(&self.root, &mut dirs);
        dirs.sort();
        dirs
    }
}

impl HeadingLister for FsVault {
    fn headings(&self, note: &Path) -> Vec<String> {
        match fs::read_to_string(note) {
            Ok(content) => markdown_headings(&content),
            Err(e) => {
                tracing::debug!(note = %note.display(), error = %e, "no headings, note unreadable");
                Vec::new()
            }
        }
    }
}

/// ATX headings (`# Title`), skipping fenced code blocks
pub fn markdown_headings(content: &str) -> Vec<String> {
    let mut headings = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if !(1..=6).contains(&level) {
            continue;
        }
        let rest = &trimmed[level..];
        if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
            continue;
        }
        let text = rest.trim().trim_end_matches('#').trim();
        if !text.is_empty() {
            headings.push(text.to_string());
        }
    }

    headings
}

/// Messages waiting to be shown, oldest first
#[derive(Debug, Default)]
pub struct Notices {
    queue: RefCell<VecDeque<String>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<String> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn drain(&self) -> Vec<String> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

impl Notifier for Notices {
    fn notify(&self, message: &str) {
        tracing::info!(message, "notice");
        self.queue.borrow_mut().push_back(message.to_string());
    }
}
