use crate::{fsync_dir, StoreError};
use std::fs;
use std::path::Path;

/// Unpack the zip archive at `archive` into `dest`, then delete the archive.
///
/// Entries whose names would escape `dest` are rejected. Returns the number of
/// files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, StoreError> {
    let shown = archive.display().to_string();
    let archive_err = |e: zip::result::ZipError| StoreError::Archive {
        path: shown.clone(),
        message: e.to_string(),
    };

    let file = fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(archive_err)?;
    fs::create_dir_all(dest)?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(archive_err)?;
        let Some(rel) = entry.enclosed_name() else {
            return Err(StoreError::UnsafeEntry {
                path: shown.clone(),
                entry: entry.name().to_owned(),
            });
        };
        let outpath = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = fs::File::create(&outpath)?;
        std::io::copy(&mut entry, &mut outfile)?;
        written += 1;
    }
    drop(zip);

    fs::remove_file(archive)?;
    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        fsync_dir(parent)?;
    }
    tracing::debug!("extracted {written} files from {shown}");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn make_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extracts_and_removes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("avg_chara.dat");
        make_zip(
            &archive,
            &[
                ("avg/", b""),
                ("avg/chara/a.ab", b"bundle-a"),
                ("top.ab", b"bundle-top"),
            ],
        );

        let n = extract_archive(&archive, dir.path()).unwrap();
        assert_eq!(n, 2);
        assert!(!archive.exists());
        assert_eq!(fs::read(dir.path().join("avg/chara/a.ab")).unwrap(), b"bundle-a");
        assert_eq!(fs::read(dir.path().join("top.ab")).unwrap(), b"bundle-top");
    }

    #[test]
    fn overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.ab"), b"old").unwrap();
        let archive = dir.path().join("x.dat");
        make_zip(&archive, &[("x.ab", b"new")]);
        extract_archive(&archive, dir.path()).unwrap();
        assert_eq!(fs::read(dir.path().join("x.ab")).unwrap(), b"new");
    }

    #[test]
    fn rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bad.dat");
        fs::write(&archive, b"<html>not a zip</html>").unwrap();
        let err = extract_archive(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Archive { .. }));
        assert!(archive.exists());
    }

    #[test]
    fn rejects_escaping_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.dat");
        make_zip(&archive, &[("../escape.ab", b"x")]);
        let dest = dir.path().join("out");
        let err = extract_archive(&archive, &dest).unwrap_err();
        assert!(matches!(err, StoreError::UnsafeEntry { .. }));
        assert!(!dir.path().join("escape.ab").exists());
    }
}
