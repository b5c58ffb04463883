//! ChunkSeal 解密合并流程实现
//!
//! 本模块负责把 chunk 目录解密并还原为原始文件。
//!
//! 合并流程（严格顺序）：
//! 1. 枚举并校验 chunk 目录，按数值序号排序
//! 2. 使用 KDF 从口令派生 key / IV
//! 3. 初始化 cipher state（作用域必须与 split 时一致）
//! 4. 目标文件只打开一次，逐 chunk 解密后立即追加写入
//! 5. 最后一个 chunk 之后 finalize，写入剩余明文
//!
//! 注意：
//! - 没有完整性校验：口令错误不会报错，只会得到错误的明文，
//!   此时 finalize 的填充校验通常失败，结果中 `padding_valid` 为 false
//! - 失败时目标文件保留已写入的部分，不做回滚

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::crypto::kdf::derive_key_and_iv;
use crate::error::{ChunkSealError, Result};
use crate::format::listing::list_chunks;
use crate::progress::{Progress, Tracker};
use crate::scope::{ChainScope, ChunkDecryptor};

/// join 的可选参数
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub scope: ChainScope,
}

/// join 完成后的统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSummary {
    pub chunk_count: u64,
    /// 写入目标文件的明文总字节数
    pub total_bytes: u64,
    /// 所有 finalize 的 PKCS#7 填充是否合法
    ///
    /// 为 false 时输出几乎必然是错误的（口令错误、作用域不匹配或密文损坏）；
    /// 为 true 并不能证明输出正确。
    pub padding_valid: bool,
}

/// 解密 `chunk_dir` 中的全部 chunk，按序写入 `destination`
pub fn join_chunks<F>(
    chunk_dir: &Path,
    destination: &Path,
    passphrase: &[u8],
    options: &JoinOptions,
    mut on_progress: F,
) -> Result<JoinSummary>
where
    F: FnMut(&Progress),
{
    // ---------- 枚举 chunk ----------
    let chunks = list_chunks(chunk_dir)?;
    let chunk_count = chunks.len() as u64;
    let cipher_bytes: u64 = chunks.iter().map(|c| c.len).sum();

    info!(
        chunk_dir = %chunk_dir.display(),
        destination = %destination.display(),
        chunks = chunk_count,
        scope = %options.scope,
        "joining chunks"
    );

    // ---------- KDF 派生 key / IV ----------
    let params = derive_key_and_iv(passphrase)?;

    // ---------- 初始化 cipher state ----------
    let mut decryptor = ChunkDecryptor::new(&params, options.scope)?;

    // ---------- 打开目标文件 ----------
    let output = File::create(destination).map_err(|e| ChunkSealError::DestinationCreate {
        path: destination.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(output);

    let write_err = |e: std::io::Error| ChunkSealError::DestinationWrite {
        path: destination.to_path_buf(),
        source: e,
    };

    // ---------- 逐 chunk 解密写入 ----------
    let mut tracker = Tracker::new(chunk_count, cipher_bytes);
    let mut total_bytes = 0u64;
    let mut padding_valid = true;

    for chunk in &chunks {
        let ciphertext = fs::read(&chunk.path).map_err(|e| ChunkSealError::ChunkOpen {
            path: chunk.path.clone(),
            source: e,
        })?;

        let is_last = chunk.index + 1 == chunk_count;
        let decrypted = decryptor.decrypt(&ciphertext, is_last)?;
        padding_valid &= decrypted.padding_valid;

        writer.write_all(&decrypted.plaintext).map_err(write_err)?;
        total_bytes += decrypted.plaintext.len() as u64;

        on_progress(&tracker.advance(chunk.index, ciphertext.len() as u64));
    }

    writer.flush().map_err(write_err)?;

    if !padding_valid {
        warn!(
            destination = %destination.display(),
            "invalid padding after decryption: wrong passphrase, mismatched chain scope or corrupted chunks"
        );
    }

    info!(
        destination = %destination.display(),
        chunks = chunk_count,
        bytes = total_bytes,
        elapsed_ms = tracker.elapsed().as_millis() as u64,
        "join complete"
    );

    Ok(JoinSummary {
        chunk_count,
        total_bytes,
        padding_valid,
    })
}

/// `destination` 的默认值：chunk 目录名去掉 `_chunks` 后缀
pub fn default_destination(chunk_dir: &Path) -> Option<PathBuf> {
    let name = chunk_dir.file_name()?.to_str()?;
    let stem = name
        .strip_suffix(crate::format::naming::DIR_SUFFIX)
        .filter(|s| !s.is_empty())?;
    Some(chunk_dir.with_file_name(stem))
}
