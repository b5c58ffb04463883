//! ChunkSeal chunk 目录枚举
//!
//! 文件列表是 chunk 数量与顺序的唯一记录，因此这里做严格校验：
//! - 按文件名解析出的数值序号排序（不依赖文件系统枚举顺序）
//! - 以 `.` 开头的隐藏文件跳过（原子写入遗留的临时文件）
//! - 其余不符合命名规则的条目直接报错
//! - 序号重复或出现缺口时报错，避免静默丢数据

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ChunkSealError, Result};
use crate::format::naming::parse_chunk_index;

/// 目录中的一个 chunk 文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEntry {
    pub index: u64,
    pub path: PathBuf,
    pub len: u64,
}

/// 枚举并校验 chunk 目录，返回按序号排好的列表
pub fn list_chunks(dir: &Path) -> Result<Vec<ChunkEntry>> {
    let dir_err = |source: io::Error| ChunkSealError::ChunkDirRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry.map_err(|e| dir_err(walkdir_to_io(e)))?;
        let name = entry.file_name();

        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let index = match parse_chunk_index(name) {
            Some(index) if entry.file_type().is_file() => index,
            _ => return Err(ChunkSealError::InvalidChunkName(entry.path().to_path_buf())),
        };

        let len = entry
            .metadata()
            .map_err(|e| dir_err(walkdir_to_io(e)))?
            .len();

        entries.push(ChunkEntry {
            index,
            path: entry.into_path(),
            len,
        });
    }

    if entries.is_empty() {
        return Err(ChunkSealError::NoChunksFound(dir.to_path_buf()));
    }

    entries.sort_by_key(|e| e.index);

    for pair in entries.windows(2) {
        if pair[0].index == pair[1].index {
            return Err(ChunkSealError::DuplicateChunk {
                index: pair[0].index,
                first: pair[0].path.clone(),
                second: pair[1].path.clone(),
            });
        }
    }

    // 排序且无重复后，序号必须恰好为 0..n
    for (expected, entry) in (0u64..).zip(&entries) {
        if entry.index != expected {
            return Err(ChunkSealError::MissingChunk(expected));
        }
    }

    Ok(entries)
}

fn walkdir_to_io(err: walkdir::Error) -> io::Error {
    io::Error::other(err.to_string())
}
