//! Archive extraction and log discovery
//!
//! Each field gets one scratch directory ([`tempfile::TempDir`]) which is
//! removed when dropped, on every exit path. Every archive is unpacked into
//! its own sub-directory so identically named members cannot clobber each
//! other.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt archive {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("cannot extract {entry} from {}: {source}", path.display())]
    Extract {
        path: PathBuf,
        entry: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot create scratch directory: {0}")]
    Scratch(#[source] io::Error),
}

/// Create the scratch directory for one field.
pub fn scratch_dir(field: &str) -> Result<TempDir, ArchiveError> {
    let prefix = format!("las-harmonizer-{}-", sanitise(field));
    tempfile::Builder::new()
        .prefix(&prefix)
        .tempdir()
        .map_err(ArchiveError::Scratch)
}

/// Archives directly inside `dir` with the given extension, sorted by name.
pub fn list_archives(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut archives: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, extension))
        .collect();
    archives.sort();
    Ok(archives)
}

/// Extract `archive` into its own sub-directory of `scratch`. Entries whose
/// paths would escape the destination are skipped. Returns the number of
/// files written.
pub fn extract_archive(archive: &Path, scratch: &Path, ordinal: usize) -> Result<usize, ArchiveError> {
    let file = File::open(archive).map_err(|source| ArchiveError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|source| ArchiveError::Corrupt {
        path: archive.to_path_buf(),
        source,
    })?;

    let stem = archive
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("archive");
    let dest = scratch.join(format!("{:04}_{}", ordinal, sanitise(stem)));
    let extract_err = |entry: &str, source: io::Error| ArchiveError::Extract {
        path: archive.to_path_buf(),
        entry: entry.to_string(),
        source,
    };
    fs::create_dir_all(&dest).map_err(|e| extract_err("", e))?;

    let mut written = 0usize;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|source| ArchiveError::Corrupt {
            path: archive.to_path_buf(),
            source,
        })?;
        let name = entry.name().to_string();
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(archive = %archive.display(), entry = %name, "Skipping archive entry with unsafe path");
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| extract_err(&name, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| extract_err(&name, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| extract_err(&name, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| extract_err(&name, e))?;
        written += 1;
    }

    debug!(archive = %archive.display(), files = written, "Archive extracted");
    Ok(written)
}

/// Every file below `root` with the given extension, sorted by file name and
/// then by full path so the order is stable across runs.
pub fn discover_logs(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable scratch entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, extension))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    files
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn sanitise(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_and_discover() {
        let src = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let a = src.path().join("a.zip");
        let b = src.path().join("b.ZIP");
        write_zip(&a, &[("z.las", "x"), ("nested/m.LAS", "y"), ("readme.txt", "z")]);
        write_zip(&b, &[("z.las", "other")]);

        let archives = list_archives(src.path(), "zip").unwrap();
        assert_eq!(archives.len(), 2);
        for (i, archive) in archives.iter().enumerate() {
            extract_archive(archive, scratch.path(), i).unwrap();
        }

        let logs = discover_logs(scratch.path(), "las");
        let names: Vec<_> = logs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        // Same-named members from different archives both survive
        assert_eq!(names, vec!["m.LAS", "z.las", "z.las"]);
    }

    #[test]
    fn test_corrupt_archive() {
        let src = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let bad = src.path().join("bad.zip");
        fs::write(&bad, b"this is not a zip file").unwrap();
        assert!(matches!(
            extract_archive(&bad, scratch.path(), 0),
            Err(ArchiveError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_unsafe_entry_skipped() {
        let src = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let archive = src.path().join("evil.zip");
        write_zip(&archive, &[("../escape.las", "x"), ("ok.las", "y")]);
        let written = extract_archive(&archive, scratch.path(), 0).unwrap();
        assert_eq!(written, 1);
        assert!(!scratch.path().join("escape.las").exists());
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let dir = scratch_dir("Field A/1").unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.exists());
        drop(dir);
        assert!(!path.exists());
    }
}
