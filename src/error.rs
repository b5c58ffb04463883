use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 切分 / 合并过程中的全部错误类型。
///
/// 所有错误对当前操作都是致命的：流水线立即中止，不做回滚。
#[derive(Debug, Error)]
pub enum ChunkSealError {
    #[error("key derivation failed")]
    KeyDerivationFailed,

    #[error("invalid cipher parameters")]
    Cipher,

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("unable to open source file {path:?}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read source file {path:?}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source file {0:?} is empty")]
    EmptySource(PathBuf),

    #[error("splitting needs {needed} chunks, naming supports at most {max}")]
    ChunkIndexOverflow { needed: u64, max: u64 },

    #[error("unable to create chunk directory {path:?}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write chunk file {path:?}")]
    ChunkWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read chunk directory {path:?}")]
    ChunkDirRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no chunks found in {0:?}")]
    NoChunksFound(PathBuf),

    #[error("unexpected file in chunk directory: {0:?}")]
    InvalidChunkName(PathBuf),

    #[error("chunk index {index} appears more than once ({first:?}, {second:?})")]
    DuplicateChunk {
        index: u64,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("chunk {0} is missing from the sequence")]
    MissingChunk(u64),

    #[error("unable to open chunk file {path:?}")]
    ChunkOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to create destination file {path:?}")]
    DestinationCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write destination file {path:?}")]
    DestinationWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ChunkSealError>;
