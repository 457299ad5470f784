// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::ZipArchive;

/// Extract a ZIP archive into `dest`, returning the number of files written.
///
/// Entries whose path would leave `dest` are skipped.
pub async fn extract_zip(archive_path: PathBuf, dest: PathBuf) -> anyhow::Result<usize> {
    info!(archive = %archive_path.display(), dest = %dest.display(), "Extracting ZIP archive");

    tokio::fs::create_dir_all(&dest).await?;

    let (archive_clone, dest_clone) = (archive_path.clone(), dest.clone());
    let files = tokio::task::spawn_blocking(move || {
        let file = File::open(&archive_clone)
            .with_context(|| format!("Failed to open archive: {}", archive_clone.display()))?;
        let mut archive = ZipArchive::new(BufReader::new(file)).context("Not a valid ZIP archive")?;
        let mut written = 0;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let outpath = match entry.enclosed_name() {
                Some(path) => dest_clone.join(path),
                None => {
                    warn!(entry = %entry.name(), "Skipping archive entry outside the destination");
                    continue;
                }
            };

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut outfile = File::create(&outpath)?;
                std::io::copy(&mut entry, &mut outfile)?;
                written += 1;
            }
        }

        Ok::<usize, anyhow::Error>(written)
    })
    .await??;

    info!(archive = %archive_path.display(), files, "ZIP extraction completed");
    Ok(files)
}

/// Directory holding the application files: the single top-level directory
/// when the archive wraps everything in one, `dir` itself otherwise.
pub async fn content_root(dir: &Path) -> anyhow::Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut only: Option<PathBuf> = None;
    let mut count = 0;

    while let Some(entry) = entries.next_entry().await? {
        count += 1;
        if count > 1 {
            return Ok(dir.to_path_buf());
        }
        if entry.file_type().await?.is_dir() {
            only = Some(entry.path());
        }
    }

    Ok(only.unwrap_or_else(|| dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::zip_archive;
    use tempfile::TempDir;

    async fn write_archive(dir: &TempDir, files: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.path().join("test.zip");
        tokio::fs::write(&path, zip_archive(files)).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_extract_nested_files() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(&dir, &[("bin/", b""), ("bin/app", b"binary"), ("README.md", b"hi")]).await;
        let dest = dir.path().join("out");

        let files = extract_zip(archive, dest.clone()).await.unwrap();

        assert_eq!(files, 2);
        assert_eq!(std::fs::read(dest.join("bin/app")).unwrap(), b"binary");
        assert_eq!(std::fs::read_to_string(dest.join("README.md")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_escaping_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(&dir, &[("../evil.txt", b"nope"), ("ok.txt", b"fine")]).await;
        let dest = dir.path().join("out");

        let files = extract_zip(archive, dest.clone()).await.unwrap();

        assert_eq!(files, 1);
        assert!(!dir.path().join("evil.txt").exists());
        assert!(dest.join("ok.txt").exists());
    }

    #[tokio::test]
    async fn test_not_a_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bogus.zip");
        tokio::fs::write(&path, b"<html>404</html>").await.unwrap();

        assert!(extract_zip(path, dir.path().join("out")).await.is_err());
    }

    #[tokio::test]
    async fn test_content_root_flattens_single_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("notes-main/src")).unwrap();

        assert_eq!(content_root(dir.path()).await.unwrap(), dir.path().join("notes-main"));
    }

    #[tokio::test]
    async fn test_content_root_keeps_multiple_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("app.py"), "print()").unwrap();

        assert_eq!(content_root(dir.path()).await.unwrap(), dir.path());
    }

    #[tokio::test]
    async fn test_content_root_single_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app.py"), "print()").unwrap();

        assert_eq!(content_root(dir.path()).await.unwrap(), dir.path());
    }
}
