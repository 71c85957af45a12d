//! PDF discovery in the two library directories.
//!
//! The Zotero directory holds PDFs that can be linked to bibliography items;
//! the local directory holds personal documents loaded without metadata.
//! Scans are flat: subdirectories are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::models::{DocumentOrigin, PaperFile};

/// List the PDF files directly inside `dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn scan_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "PDF directory missing, nothing to scan");
        return Ok(Vec::new());
    }

    let mut pdfs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_pdf(&path) {
            pdfs.push(path);
        }
    }
    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(pdfs)
}

/// Check if a path has a `.pdf` extension (any case).
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
}

/// The merged view of both directories.
#[derive(Debug, Clone, Default)]
pub struct LibraryInventory {
    pub zotero: Vec<PaperFile>,
    pub local: Vec<PaperFile>,
}

impl LibraryInventory {
    pub fn scan(papers_dir: &Path, local_dir: &Path) -> Result<Self> {
        let zotero = scan_pdfs(papers_dir)?
            .into_iter()
            .map(|p| PaperFile::new(p, DocumentOrigin::Zotero))
            .collect();
        let local = scan_pdfs(local_dir)?
            .into_iter()
            .map(|p| PaperFile::new(p, DocumentOrigin::Local))
            .collect();
        Ok(Self { zotero, local })
    }

    pub fn total(&self) -> usize {
        self.zotero.len() + self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Zotero files first, then local ones.
    pub fn iter(&self) -> impl Iterator<Item = &PaperFile> {
        self.zotero.iter().chain(self.local.iter())
    }
}

// ─── Tests ─────────────────────────────────────────────────
