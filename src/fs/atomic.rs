//! ChunkSeal 原子写入工具。
//!
//! 每个 chunk 文件都「先写隐藏临时文件，成功后再 rename」，
//! 中途失败时目录里不会出现截断的 `chunk_NNNNN`。
//! 临时文件以 `.` 开头，join 枚举目录时会跳过它们。

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 原子地把 `data` 写到 `target`。
///
/// 流程：
/// 1. 在目标目录创建临时文件；
/// 2. 写入完整内容并 sync；
/// 3. rename 替换目标文件（已存在的旧 chunk 会被覆盖）。
pub fn write_atomic(target: &Path, data: &[u8]) -> io::Result<()> {
    let parent = target.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "target path has no parent directory",
        )
    })?;

    let tmp_path = build_tmp_path(parent, target);

    let result = File::create(&tmp_path).and_then(|mut tmp_file| {
        tmp_file.write_all(data)?;
        tmp_file.sync_all()
    });

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if target.exists() {
        if let Err(err) = fs::remove_file(target) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
    }

    if let Err(err) = fs::rename(&tmp_path, target) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    Ok(())
}

fn build_tmp_path(parent: &Path, target: &Path) -> PathBuf {
    let base_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("chunk");

    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);

    parent.join(format!(
        ".{base_name}.tmp-{}-{counter}",
        std::process::id()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_replaces() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("chunk_00000");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"second");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_parent_fails_without_leftovers() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("gone").join("chunk_00000");

        assert!(write_atomic(&target, b"data").is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unreplaceable_target_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("chunk_00000");
        fs::create_dir(&target).unwrap();

        assert!(write_atomic(&target, b"data").is_err());

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("chunk_00000")]);
        assert!(target.is_dir());
    }

    #[test]
    fn temp_names_are_hidden() {
        let tmp = build_tmp_path(Path::new("/x"), Path::new("/x/chunk_00003"));
        let name = tmp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".chunk_00003.tmp-"));
    }
}
