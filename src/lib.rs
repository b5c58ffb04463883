//! ChunkSeal：把文件切分为固定大小的加密 chunk，并按序解密合并还原。
//!
//! - 口令经 PBKDF2-HMAC-SHA256 派生 AES-256-CBC 的 key / IV
//! - 默认整个文件共享一个 cipher state，chunk 之间保留 CBC 链接状态
//! - chunk 顺序只由文件名 `chunk_NNNNN` 编码，没有 manifest
//! - 没有完整性校验：口令错误只会得到错误的明文

mod join;
mod split;

pub mod crypto;
pub mod error;
pub mod format;
pub mod fs;
pub mod progress;
pub mod scope;

pub use error::{ChunkSealError, Result};
pub use join::{JoinOptions, JoinSummary, default_destination, join_chunks};
pub use progress::Progress;
pub use scope::ChainScope;
pub use split::{SplitOptions, SplitSummary, split_file};

use std::path::Path;

/// 使用默认作用域切分并加密文件，chunk 目录建在 `dest_dir` 下
pub fn split(
    source: &Path,
    chunk_size: usize,
    dest_dir: &Path,
    passphrase: &str,
) -> Result<SplitSummary> {
    split_file(
        source,
        chunk_size,
        dest_dir,
        passphrase.as_bytes(),
        &SplitOptions::default(),
        |_| {},
    )
}

/// 使用默认作用域解密并合并 chunk 目录
pub fn join(chunk_dir: &Path, destination: &Path, passphrase: &str) -> Result<JoinSummary> {
    join_chunks(
        chunk_dir,
        destination,
        passphrase.as_bytes(),
        &JoinOptions::default(),
        |_| {},
    )
}
