use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
}

pub trait FileSystem {
    fn list_directory(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    fn is_file(&self, path: &Path) -> bool;
    fn exists(&self, path: &Path) -> bool;
    fn same_file(&self, a: &Path, b: &Path) -> bool;
    fn stat(&self, path: &Path) -> io::Result<FileTimes>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn list_directory(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            out.push(entry.into_path());
        }
        Ok(out)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn same_file(&self, a: &Path, b: &Path) -> bool {
        same_file::is_same_file(a, b).unwrap_or(false)
    }

    fn stat(&self, path: &Path) -> io::Result<FileTimes> {
        let meta = fs::metadata(path)?;
        let modified = meta.modified()?;
        let created = meta.created().unwrap_or(modified);
        Ok(FileTimes {
            created: DateTime::from(created),
            modified: DateTime::from(modified),
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn list_directory_returns_direct_children_only() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a.txt"), b"a").expect("write a");
        fs::create_dir_all(temp.path().join("nested")).expect("create nested");
        fs::write(temp.path().join("nested").join("b.txt"), b"b").expect("write b");

        let mut names: Vec<String> = StdFileSystem
            .list_directory(temp.path())
            .expect("list")
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "nested"]);
    }

    #[test]
    fn list_directory_fails_for_missing_dir() {
        let temp = tempdir().expect("tempdir");
        assert!(StdFileSystem
            .list_directory(&temp.path().join("missing"))
            .is_err());
    }

    #[test]
    fn same_file_compares_identity_not_spelling() {
        let temp = tempdir().expect("tempdir");
        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        fs::write(&a, b"a").expect("write a");
        fs::write(&b, b"b").expect("write b");
        assert!(StdFileSystem.same_file(&a, &temp.path().join(".").join("a.txt")));
        assert!(!StdFileSystem.same_file(&a, &b));
        assert!(!StdFileSystem.same_file(&a, &temp.path().join("missing")));
    }

    #[test]
    fn stat_reports_modified_time() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("a.txt");
        fs::write(&path, b"a").expect("write");
        let times = StdFileSystem.stat(&path).expect("stat");
        assert!(times.modified <= Local::now());
    }
}
