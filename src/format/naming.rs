//! ChunkSeal chunk 命名规则
//!
//! 磁盘上没有 manifest，chunk 的顺序完全由文件名编码：
//! - 目录：`<源文件 stem>_chunks`
//! - 文件：`chunk_` + 5 位零填充序号
//!
//! 5 位宽度下字典序与数值序一致；超过 99,999 的序号
//! 会破坏字典序，因此 split 直接拒绝，而不是默默写出。

use std::ffi::{OsStr, OsString};
use std::path::Path;

/// chunk 文件名前缀
pub const CHUNK_PREFIX: &str = "chunk_";

/// chunk 目录名后缀
pub const DIR_SUFFIX: &str = "_chunks";

/// 序号零填充宽度
pub const INDEX_WIDTH: usize = 5;

/// 可表示的最大 chunk 数量（序号 0..=99,999）
pub const MAX_CHUNKS: u64 = 100_000;

/// 第 `index` 个 chunk 的文件名
pub fn chunk_file_name(index: u64) -> String {
    format!("{CHUNK_PREFIX}{index:0width$}", width = INDEX_WIDTH)
}

/// 从文件名中解析 chunk 序号
///
/// 只接受 `chunk_<数字>`；不要求零填充，
/// join 按解析出的数值排序。
pub fn parse_chunk_index(name: &OsStr) -> Option<u64> {
    let digits = name.to_str()?.strip_prefix(CHUNK_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 源文件对应的 chunk 目录名
pub fn chunk_dir_name(source: &Path) -> Option<OsString> {
    let stem = source.file_stem().filter(|s| !s.is_empty())?;
    let mut name = stem.to_os_string();
    name.push(DIR_SUFFIX);
    Some(name)
}

/// 切分 `len` 字节所需的 chunk 数量
pub fn chunk_count(len: u64, chunk_size: u64) -> u64 {
    len.div_ceil(chunk_size)
}
