//! ChunkSeal cipher 上下文作用域。
//!
//! 决定 split / join 如何复用 cipher state。两种方式产生的
//! chunk 目录互不兼容，join 必须使用与 split 相同的作用域。
//!
//! `ChunkEncryptor` / `ChunkDecryptor` 把作用域规则落到
//! `EncryptState` / `DecryptState` 上：调用方按顺序逐个送入 chunk，
//! 并告知哪一个是最后一个。

use std::fmt;
use std::str::FromStr;

use crate::crypto::cipher::{DecryptState, EncryptState};
use crate::crypto::kdf::CipherParams;
use crate::error::Result;

/// cipher state 的复用方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainScope {
    /// 整个文件共享一个 state，只在最后一个 chunk 上 finalize。
    #[default]
    WholeFile,
    /// 每个 chunk 使用全新的 state（相同 key / IV），各自填充。
    PerChunk,
}

impl ChainScope {
    pub const WHOLE_FILE_NAME: &'static str = "whole-file";
    pub const PER_CHUNK_NAME: &'static str = "per-chunk";

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WholeFile => Self::WHOLE_FILE_NAME,
            Self::PerChunk => Self::PER_CHUNK_NAME,
        }
    }
}

impl fmt::Display for ChainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            Self::WHOLE_FILE_NAME | "file" => Ok(Self::WholeFile),
            Self::PER_CHUNK_NAME | "chunk" => Ok(Self::PerChunk),
            other => Err(format!(
                "unknown chain scope '{other}' (expected '{}' or '{}')",
                Self::WHOLE_FILE_NAME,
                Self::PER_CHUNK_NAME
            )),
        }
    }
}

/// 按作用域驱动加密 state
pub struct ChunkEncryptor<'a> {
    params: &'a CipherParams,
    scope: ChainScope,
    state: Option<EncryptState>,
}

impl<'a> ChunkEncryptor<'a> {
    pub fn new(params: &'a CipherParams, scope: ChainScope) -> Result<Self> {
        Ok(Self {
            params,
            scope,
            state: Some(EncryptState::new(params)?),
        })
    }

    /// 加密一个 chunk，返回应写入该 chunk 文件的密文
    pub fn encrypt(&mut self, chunk: &[u8], is_last: bool) -> Result<Vec<u8>> {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => EncryptState::new(self.params)?,
        };

        let mut out = state.update(chunk);

        if is_last || self.scope == ChainScope::PerChunk {
            out.extend(state.finalize());
        } else {
            self.state = Some(state);
        }

        Ok(out)
    }
}

/// 单个 chunk 的解密结果
#[derive(Debug)]
pub struct DecryptedChunk {
    pub plaintext: Vec<u8>,
    /// 本次 finalize 的填充校验结果；未 finalize 时为 true
    pub padding_valid: bool,
}

/// 按作用域驱动解密 state
pub struct ChunkDecryptor<'a> {
    params: &'a CipherParams,
    scope: ChainScope,
    state: Option<DecryptState>,
}

impl<'a> ChunkDecryptor<'a> {
    pub fn new(params: &'a CipherParams, scope: ChainScope) -> Result<Self> {
        Ok(Self {
            params,
            scope,
            state: Some(DecryptState::new(params)?),
        })
    }

    pub fn decrypt(&mut self, chunk: &[u8], is_last: bool) -> Result<DecryptedChunk> {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => DecryptState::new(self.params)?,
        };

        let mut plaintext = state.update(chunk);
        let mut padding_valid = true;

        if is_last || self.scope == ChainScope::PerChunk {
            match state.finalize() {
                Some(tail) => plaintext.extend(tail),
                None => padding_valid = false,
            }
        } else {
            self.state = Some(state);
        }

        Ok(DecryptedChunk {
            plaintext,
            padding_valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::BLOCK_SIZE;
    use crate::crypto::kdf::derive_key_and_iv;

    fn encrypt_all(scope: ChainScope, chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        let params = derive_key_and_iv(b"secret123").unwrap();
        let mut encryptor = ChunkEncryptor::new(&params, scope).unwrap();
        chunks
            .iter()
            .enumerate()
            .map(|(i, c)| encryptor.encrypt(c, i + 1 == chunks.len()).unwrap())
            .collect()
    }

    fn decrypt_all(scope: ChainScope, passphrase: &[u8], chunks: &[Vec<u8>]) -> (Vec<u8>, bool) {
        let params = derive_key_and_iv(passphrase).unwrap();
        let mut decryptor = ChunkDecryptor::new(&params, scope).unwrap();
        let mut out = Vec::new();
        let mut valid = true;
        for (i, c) in chunks.iter().enumerate() {
            let chunk = decryptor.decrypt(c, i + 1 == chunks.len()).unwrap();
            out.extend(chunk.plaintext);
            valid &= chunk.padding_valid;
        }
        (out, valid)
    }

    const DATA: &[u8] = b"the quick brown fox jumps over the lazy dog, twice over: \
                          the quick brown fox jumps over the lazy dog";

    #[test]
    fn whole_file_roundtrip() {
        let pieces: Vec<&[u8]> = DATA.chunks(20).collect();
        let encrypted = encrypt_all(ChainScope::WholeFile, &pieces);

        let (plain, valid) = decrypt_all(ChainScope::WholeFile, b"secret123", &encrypted);
        assert!(valid);
        assert_eq!(plain, DATA);
    }

    #[test]
    fn per_chunk_roundtrip_pads_every_chunk() {
        let pieces: Vec<&[u8]> = DATA.chunks(20).collect();
        let encrypted = encrypt_all(ChainScope::PerChunk, &pieces);

        for (piece, cipher) in pieces.iter().zip(&encrypted) {
            assert_eq!(cipher.len(), (piece.len() / BLOCK_SIZE + 1) * BLOCK_SIZE);
        }

        let (plain, valid) = decrypt_all(ChainScope::PerChunk, b"secret123", &encrypted);
        assert!(valid);
        assert_eq!(plain, DATA);
    }

    #[test]
    fn scopes_produce_different_streams() {
        let pieces: Vec<&[u8]> = DATA.chunks(32).collect();
        let whole = encrypt_all(ChainScope::WholeFile, &pieces);
        let per_chunk = encrypt_all(ChainScope::PerChunk, &pieces);

        // 第一个 chunk 的前 32 字节相同，之后链接状态分叉
        assert_eq!(whole[0][..32], per_chunk[0][..32]);
        assert_ne!(whole.concat(), per_chunk.concat());
    }

    #[test]
    fn mismatched_scope_does_not_reproduce_plaintext() {
        let pieces: Vec<&[u8]> = DATA.chunks(32).collect();
        let encrypted = encrypt_all(ChainScope::PerChunk, &pieces);

        let (plain, _) = decrypt_all(ChainScope::WholeFile, b"secret123", &encrypted);
        assert_ne!(plain, DATA);
    }

    #[test]
    fn whole_file_chunk_may_be_empty() {
        let pieces: Vec<&[u8]> = vec![&b"tiny"[..], &b"bits"[..], &b"end"[..]];
        let encrypted = encrypt_all(ChainScope::WholeFile, &pieces);

        assert!(encrypted[0].is_empty());
        assert!(encrypted[1].is_empty());
        assert_eq!(encrypted[2].len(), BLOCK_SIZE);

        let (plain, valid) = decrypt_all(ChainScope::WholeFile, b"secret123", &encrypted);
        assert!(valid);
        assert_eq!(plain, b"tinybitsend");
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("whole-file".parse(), Ok(ChainScope::WholeFile));
        assert_eq!("Per-Chunk".parse(), Ok(ChainScope::PerChunk));
        assert_eq!("chunk".parse(), Ok(ChainScope::PerChunk));
        assert!("stream".parse::<ChainScope>().is_err());
    }

    #[test]
    fn display_roundtrips() {
        for scope in [ChainScope::WholeFile, ChainScope::PerChunk] {
            assert_eq!(scope.to_string().parse(), Ok(scope));
        }
    }
}
