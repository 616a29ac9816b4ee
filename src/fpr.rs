//! Scan bundle access.
//!
//! An FPR bundle is a zip archive whose findings document is the
//! `audit.fvdl` entry. The converter needs several independent streaming
//! passes over that document, so it is extracted once into a run-scoped
//! temporary directory; each pass opens a fresh reader over the extracted
//! file. The directory is removed when the bundle is dropped, on every exit
//! path.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use zip::ZipArchive;

use crate::config::FVDL_ENTRY;
use crate::error::{FprError, Result};

/// An opened scan bundle with its findings document extracted.
#[derive(Debug)]
pub struct FprBundle {
    fvdl_path: PathBuf,
    _extract_dir: TempDir,
}

impl FprBundle {
    /// Open a bundle and extract its findings document.
    ///
    /// # Arguments
    /// * `path` - Path to the `.fpr` archive
    ///
    /// # Errors
    /// Fails when the archive cannot be read or has no findings entry.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut entry = archive.by_name(FVDL_ENTRY).map_err(|_| FprError::MissingEntry {
            entry: FVDL_ENTRY.to_string(),
            archive: path.to_path_buf(),
        })?;

        let extract_dir = TempDir::with_prefix("fpr-bundle-")?;
        let fvdl_path = extract_dir.path().join(FVDL_ENTRY);
        let mut out = File::create(&fvdl_path)?;
        let bytes = io::copy(&mut entry, &mut out)?;
        debug!(bytes, path = %fvdl_path.display(), "extracted findings document");

        Ok(Self {
            fvdl_path,
            _extract_dir: extract_dir,
        })
    }

    /// Open a fresh reader over the findings document for one streaming pass.
    pub fn findings_reader(&self) -> Result<BufReader<File>> {
        Ok(BufReader::new(File::open(&self.fvdl_path)?))
    }
}
