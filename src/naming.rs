//! Output file naming: URL basenames and collision-free paths.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Returns the last path segment of `url`, ignoring trailing slashes.
///
/// The URL is treated as an opaque string: query strings and fragments stay
/// part of the name. Returns `None` when nothing usable is left.
pub fn base_name(url: &str) -> Option<&str> {
    let trimmed = url.trim_end_matches('/');
    let segment = match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(segment)
}

/// `name.ext` with counter `n` becomes `name-n.ext`; `n == 0` is the name itself.
///
/// The extension starts at the last dot, so a name that only has a leading
/// dot is all extension: `.bashrc` becomes `-1.bashrc`.
pub fn disambiguated(file_name: &str, n: usize) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.rfind('.') {
        Some(idx) => format!("{}-{}{}", &file_name[..idx], n, &file_name[idx..]),
        None => format!("{}-{}", file_name, n),
    }
}

/// Hands out output paths that neither exist on disk nor were already given
/// to another worker of this run.
///
/// Claims are held for the lifetime of the allocator. Another process writing
/// into the same directory is not coordinated with.
#[derive(Debug, Default)]
pub struct PathAllocator {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl PathAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, dir: &Path, file_name: &str) -> PathBuf {
        let mut claimed = self
            .claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // A stat error other than "not found" marks the name as taken. When the
        // next candidate fails the same way, the directory itself is at fault:
        // the first failing name is handed out and creating it reports why.
        let mut failing: Option<(io::ErrorKind, PathBuf)> = None;
        let mut n = 0;
        let candidate = loop {
            let candidate = dir.join(disambiguated(file_name, n));
            n += 1;
            if claimed.contains(&candidate) {
                continue;
            }
            match fs::symlink_metadata(&candidate) {
                Ok(_) => failing = None,
                Err(e) if e.kind() == io::ErrorKind::NotFound => break candidate,
                Err(e) => match failing.take() {
                    Some((kind, first)) if kind == e.kind() => break first,
                    _ => failing = Some((e.kind(), candidate)),
                },
            }
        };

        claimed.insert(candidate.clone());
        candidate
    }
}
