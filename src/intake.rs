//! Intake: stage uploaded PDFs into the working directory.
//!
//! Every staging operation first clears the working directory (regular files
//! only), then populates it from the new input and returns a [`Batch`] — an
//! explicit context holding the staged file list. The pipeline only ever
//! reads the `Batch`, never the directory again, so a run's input set is
//! fixed the moment staging returns.
//!
//! Files are staged by base name; two inputs with the same base name collide
//! and the later one wins silently. Archive entries are sanitized: an entry
//! whose path would escape the working directory aborts staging.

use crate::error::CatalogError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The staged input of one run: working directory plus the ordered list of
/// PDFs found in it.
///
/// Order is directory enumeration order and is not stable across runs or
/// platforms; callers must not rely on it.
#[derive(Debug)]
pub struct Batch {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl Batch {
    /// Enumerate the top-level `.pdf` files (ASCII case-insensitive) of `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, CatalogError> {
        let mut files = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| CatalogError::WorkingDir {
            path: dir.to_path_buf(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::WorkingDir {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file() && is_pdf_name(&path) {
                files.push(path);
            }
        }

        debug!("Batch holds {} PDFs from {}", files.len(), dir.display());
        Ok(Self {
            root: dir.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_pdf_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Create the working directory if absent and remove all regular files in it.
///
/// Subdirectories are left alone; only top-level files belong to a run.
pub fn clear_working_dir(dir: &Path) -> Result<(), CatalogError> {
    let wrap = |e: std::io::Error| CatalogError::WorkingDir {
        path: dir.to_path_buf(),
        source: e,
    };

    fs::create_dir_all(dir).map_err(wrap)?;
    for entry in fs::read_dir(dir).map_err(wrap)? {
        let entry = entry.map_err(wrap)?;
        let path = entry.path();
        if path.is_file() {
            fs::remove_file(&path).map_err(wrap)?;
        }
    }
    Ok(())
}

/// Stage a single uploaded PDF.
pub fn stage_file(dir: &Path, src: &Path) -> Result<Batch, CatalogError> {
    clear_working_dir(dir)?;
    copy_by_base_name(dir, src)?;
    Batch::from_dir(dir)
}

/// Stage a multi-file selection, copying each by base name.
pub fn stage_files(dir: &Path, srcs: &[PathBuf]) -> Result<Batch, CatalogError> {
    clear_working_dir(dir)?;
    for src in srcs {
        copy_by_base_name(dir, src)?;
    }
    Batch::from_dir(dir)
}

/// Stage a ZIP archive by extracting all entries into the working directory.
///
/// A corrupt archive is fatal for the whole run. Entry paths pass through
/// the zip crate's `enclosed_name` check so `../`-style entries cannot write
/// outside the working directory.
pub fn stage_archive(dir: &Path, archive_path: &Path) -> Result<Batch, CatalogError> {
    clear_working_dir(dir)?;
    extract_archive(dir, archive_path)?;
    Batch::from_dir(dir)
}

fn copy_by_base_name(dir: &Path, src: &Path) -> Result<(), CatalogError> {
    let name = src
        .file_name()
        .ok_or_else(|| CatalogError::StageFailed {
            path: src.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
        })?;

    let dest = dir.join(name);
    if dest.exists() {
        warn!("Overwriting staged file {}", dest.display());
    }
    fs::copy(src, &dest).map_err(|e| CatalogError::StageFailed {
        path: src.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn extract_archive(dir: &Path, archive_path: &Path) -> Result<(), CatalogError> {
    let bad = |detail: String| CatalogError::BadArchive {
        path: archive_path.to_path_buf(),
        detail,
    };

    let file = fs::File::open(archive_path).map_err(|e| bad(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| bad(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| bad(e.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(CatalogError::UnsafeArchiveEntry {
                name: entry.name().to_string(),
            });
        };
        let dest = dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest).map_err(|e| bad(e.to_string()))?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| bad(e.to_string()))?;
        }
        let mut out = fs::File::create(&dest).map_err(|e| bad(e.to_string()))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| bad(e.to_string()))?;
    }

    info!(
        "Extracted {} entries from {}",
        archive.len(),
        archive_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"%PDF-1.4 test").unwrap();
        path
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn stage_single_clears_prior_contents() {
        let work = TempDir::new().unwrap();
        let upload = TempDir::new().unwrap();
        touch(work.path(), "stale.pdf");

        let src = touch(upload.path(), "fresh.pdf");
        let batch = stage_file(work.path(), &src).unwrap();

        assert_eq!(batch.len(), 1);
        assert!(batch.files()[0].ends_with("fresh.pdf"));
        assert!(!work.path().join("stale.pdf").exists());
    }

    #[test]
    fn stage_files_collides_on_base_name() {
        let work = TempDir::new().unwrap();
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();

        let first = touch(a.path(), "book.pdf");
        let second = touch(b.path(), "book.pdf");
        let batch = stage_files(work.path(), &[first, second]).unwrap();

        // Same base name: the later copy silently wins.
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn stage_archive_extracts_pdfs() {
        let work = TempDir::new().unwrap();
        let upload = TempDir::new().unwrap();
        let zip_path = upload.path().join("books.zip");
        write_zip(&zip_path, &[("a.pdf", b"%PDF a"), ("b.pdf", b"%PDF b")]);

        let batch = stage_archive(work.path(), &zip_path).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn non_pdf_entries_are_staged_but_not_listed() {
        let work = TempDir::new().unwrap();
        let upload = TempDir::new().unwrap();
        let zip_path = upload.path().join("mixed.zip");
        write_zip(&zip_path, &[("a.pdf", b"%PDF a"), ("notes.txt", b"hi")]);

        let batch = stage_archive(work.path(), &zip_path).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(work.path().join("notes.txt").exists());
    }

    #[test]
    fn traversal_entry_is_rejected() {
        let work = TempDir::new().unwrap();
        let upload = TempDir::new().unwrap();
        let zip_path = upload.path().join("evil.zip");
        write_zip(&zip_path, &[("../evil.pdf", b"%PDF evil")]);

        let result = stage_archive(work.path(), &zip_path);
        assert!(matches!(
            result,
            Err(CatalogError::UnsafeArchiveEntry { .. })
        ));
        assert!(!upload.path().join("evil.pdf").exists());
    }

    #[test]
    fn corrupt_archive_is_fatal() {
        let work = TempDir::new().unwrap();
        let upload = TempDir::new().unwrap();
        let zip_path = upload.path().join("broken.zip");
        fs::write(&zip_path, b"this is not a zip").unwrap();

        let result = stage_archive(work.path(), &zip_path);
        assert!(matches!(result, Err(CatalogError::BadArchive { .. })));
    }

    #[test]
    fn listing_is_case_insensitive_on_extension() {
        let work = TempDir::new().unwrap();
        touch(work.path(), "UPPER.PDF");
        touch(work.path(), "lower.pdf");
        fs::write(work.path().join("ignored.txt"), b"x").unwrap();

        let batch = Batch::from_dir(work.path()).unwrap();
        assert_eq!(batch.len(), 2);
    }
}
