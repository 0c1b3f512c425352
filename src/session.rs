//! Transport seam. A session is the single authenticated connection every
//! station fetch goes through; taking it as `&mut` keeps one fetch in
//! flight at a time.

use anyhow::Context;
use std::fs;
use std::path::PathBuf;

pub trait Session {
    /// Fetch the raw text of the page at `address`.
    fn fetch_page(&mut self, address: &str) -> anyhow::Result<String>;
}

/// Serves previously saved pages from a directory.
///
/// `StationMenu?id=1` is read from `<root>/StationMenu_id_1.html`.
#[derive(Debug, Clone)]
pub struct DirSession {
    root: PathBuf,
}

impl DirSession {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, address: &str) -> PathBuf {
        self.root.join(page_file_name(address))
    }
}

impl Session for DirSession {
    fn fetch_page(&mut self, address: &str) -> anyhow::Result<String> {
        let path = self.path_for(address);
        fs::read_to_string(&path).with_context(|| format!("read page {}", path.display()))
    }
}

/// File name a saved page is stored under.
pub fn page_file_name(address: &str) -> String {
    let stem: String = address
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}.html", stem)
}
