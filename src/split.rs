//! ChunkSeal 切分加密流程实现
//!
//! 本模块负责把一个普通文件切分为若干 chunk 文件并逐个加密。
//!
//! 切分流程（严格顺序）：
//! 1. 校验 chunk 大小与源文件
//! 2. 使用 KDF 从口令派生 key / IV（整个操作只派生一次）
//! 3. 初始化 cipher state，按作用域贯穿整个文件或逐 chunk 重建
//! 4. 创建 `<stem>_chunks` 目录（已存在则复用）
//! 5. 顺序读取 chunk，加密后立即原子写出，不在内存中累积
//! 6. 最后一个 chunk 上 finalize，填充写入该 chunk
//!
//! 注意：
//! - 失败时已写出的 chunk 文件不会被清理
//! - 不做 UI / 口令输入

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::crypto::kdf::derive_key_and_iv;
use crate::error::{ChunkSealError, Result};
use crate::format::naming::{
    MAX_CHUNKS, chunk_count, chunk_dir_name, chunk_file_name, parse_chunk_index,
};
use crate::fs::atomic::write_atomic;
use crate::progress::{Progress, Tracker};
use crate::scope::{ChainScope, ChunkEncryptor};

/// split 的可选参数
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    pub scope: ChainScope,
}

/// split 完成后的统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    pub chunk_dir: PathBuf,
    pub chunk_count: u64,
    /// 读取的明文总字节数
    pub total_bytes: u64,
}

/// 切分并加密 `source`，chunk 目录建在 `dest_dir` 下
pub fn split_file<F>(
    source: &Path,
    chunk_size: usize,
    dest_dir: &Path,
    passphrase: &[u8],
    options: &SplitOptions,
    mut on_progress: F,
) -> Result<SplitSummary>
where
    F: FnMut(&Progress),
{
    if chunk_size == 0 {
        return Err(ChunkSealError::InvalidChunkSize);
    }

    // ---------- 打开源文件 ----------
    let open_err = |source_err: io::Error| ChunkSealError::SourceOpen {
        path: source.to_path_buf(),
        source: source_err,
    };

    let mut input = File::open(source).map_err(open_err)?;
    let metadata = input.metadata().map_err(open_err)?;

    if !metadata.is_file() {
        return Err(open_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "source is not a regular file",
        )));
    }

    let total_bytes = metadata.len();
    if total_bytes == 0 {
        return Err(ChunkSealError::EmptySource(source.to_path_buf()));
    }

    let expected_chunks = chunk_count(total_bytes, chunk_size as u64);
    if expected_chunks > MAX_CHUNKS {
        return Err(ChunkSealError::ChunkIndexOverflow {
            needed: expected_chunks,
            max: MAX_CHUNKS,
        });
    }

    let dir_name = chunk_dir_name(source).ok_or_else(|| {
        open_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "source path has no file name",
        ))
    })?;

    info!(
        source = %source.display(),
        chunk_size,
        chunks = expected_chunks,
        scope = %options.scope,
        "splitting file"
    );

    // ---------- KDF 派生 key / IV ----------
    let params = derive_key_and_iv(passphrase)?;

    // ---------- 初始化 cipher state ----------
    let mut encryptor = ChunkEncryptor::new(&params, options.scope)?;

    // ---------- 创建 chunk 目录 ----------
    let chunk_dir = dest_dir.join(dir_name);
    fs::create_dir_all(&chunk_dir).map_err(|e| ChunkSealError::DirectoryCreate {
        path: chunk_dir.clone(),
        source: e,
    })?;

    // ---------- 逐 chunk 加密写出 ----------
    let read_err = |e: io::Error| ChunkSealError::SourceRead {
        path: source.to_path_buf(),
        source: e,
    };

    // 预读下一个 chunk，才能确定当前 chunk 是否为最后一个。
    // 缓冲区不超过文件长度：chunk_size 远大于文件时只按实际大小分配。
    let buf_len = usize::try_from(total_bytes).map_or(chunk_size, |len| len.min(chunk_size));
    let mut current = Zeroizing::new(vec![0u8; buf_len]);
    let mut next = Zeroizing::new(vec![0u8; buf_len]);
    let mut current_len = read_full(&mut input, &mut current[..]).map_err(read_err)?;

    let mut tracker = Tracker::new(expected_chunks, total_bytes);
    let mut index = 0u64;
    let mut bytes_read = 0u64;

    while current_len > 0 {
        if index >= MAX_CHUNKS {
            return Err(ChunkSealError::ChunkIndexOverflow {
                needed: index + 1,
                max: MAX_CHUNKS,
            });
        }

        let next_len = if current_len == chunk_size {
            read_full(&mut input, &mut next[..]).map_err(read_err)?
        } else {
            0
        };
        let is_last = next_len == 0;

        let ciphertext = encryptor.encrypt(&current[..current_len], is_last)?;

        let chunk_path = chunk_dir.join(chunk_file_name(index));
        write_atomic(&chunk_path, &ciphertext).map_err(|e| ChunkSealError::ChunkWrite {
            path: chunk_path.clone(),
            source: e,
        })?;

        bytes_read += current_len as u64;
        on_progress(&tracker.advance(index, current_len as u64));

        index += 1;
        std::mem::swap(&mut current, &mut next);
        current_len = next_len;
    }

    remove_stale_chunks(&chunk_dir, index)?;

    info!(
        chunk_dir = %chunk_dir.display(),
        chunks = index,
        bytes = bytes_read,
        elapsed_ms = tracker.elapsed().as_millis() as u64,
        "split complete"
    );

    Ok(SplitSummary {
        chunk_dir,
        chunk_count: index,
        total_bytes: bytes_read,
    })
}

/// 尽量填满 `buf`，仅在 EOF 时返回较短的长度
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

/// 删除上一次更大规模切分遗留的 chunk（序号 >= `count`）
///
/// 复用目录时若不清理，join 会把它们拼到新文件末尾，
/// 因此清理失败与写 chunk 失败同样处理。
fn remove_stale_chunks(chunk_dir: &Path, count: u64) -> Result<()> {
    let write_err = |path: &Path, e: io::Error| ChunkSealError::ChunkWrite {
        path: path.to_path_buf(),
        source: e,
    };

    let entries = fs::read_dir(chunk_dir).map_err(|e| write_err(chunk_dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| write_err(chunk_dir, e))?;
        let stale = parse_chunk_index(&entry.file_name()).is_some_and(|i| i >= count);
        if !stale {
            continue;
        }

        let path = entry.path();
        fs::remove_file(&path).map_err(|e| write_err(&path, e))?;
        warn!(path = %path.display(), "removed stale chunk from a previous split");
    }

    Ok(())
}
