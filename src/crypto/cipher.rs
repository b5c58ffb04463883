//! ChunkSeal 流式 AES-256-CBC 状态
//!
//! 本模块把「跨 chunk 的链接状态」建模为显式的值：
//! - `EncryptState` / `DecryptState` 由调用方持有，
//!   依次对每个 chunk 调用 `update`，最后调用一次 `finalize`
//! - CBC 链接状态与不足一块的残余数据都保存在 state 内部
//!
//! 语义与 OpenSSL EVP update / final 逐字节一致：
//! - 加密 update 输出所有完整块，残余（< 16 字节）留待下次
//! - 加密 finalize 对残余做 PKCS#7 填充，恰好输出一个块
//! - 解密 update 在输入恰好对齐时保留最后一个完整块（可能含填充）
//! - 解密 finalize 去除 PKCS#7 填充
//!
//! 注意：
//! - 同一个 state 贯穿整个文件，与每个 chunk 新建一个 state，
//!   得到的是互不兼容的两种密文流；具体选择见 `ChainScope`

use aes::Aes256;
use cbc::cipher::block_padding::{Padding, Pkcs7};
use cbc::cipher::consts::U16;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroize;

use crate::crypto::kdf::CipherParams;
use crate::error::{ChunkSealError, Result};

/// AES 块大小（字节）
pub const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// 加密方向的流式状态
pub struct EncryptState {
    cipher: Aes256CbcEnc,
    pending: Vec<u8>,
}

impl EncryptState {
    pub fn new(params: &CipherParams) -> Result<Self> {
        let cipher = Aes256CbcEnc::new_from_slices(&params.key[..], &params.iv[..])
            .map_err(|_| ChunkSealError::Cipher)?;

        Ok(Self {
            cipher,
            pending: Vec::with_capacity(BLOCK_SIZE),
        })
    }

    /// 送入一段明文，返回当前可输出的全部密文块
    pub fn update(&mut self, input: &[u8]) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.pending);
        out.extend_from_slice(input);

        let aligned = out.len() - out.len() % BLOCK_SIZE;
        self.pending = out.split_off(aligned);

        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher
                .encrypt_block_mut(GenericArray::from_mut_slice(block));
        }

        out
    }

    /// 填充并加密残余数据，输出最后一个块
    pub fn finalize(mut self) -> Vec<u8> {
        let mut block = GenericArray::<u8, U16>::default();
        let pos = self.pending.len();
        block[..pos].copy_from_slice(&self.pending);

        <Pkcs7 as Padding<U16>>::pad(&mut block, pos);
        self.cipher.encrypt_block_mut(&mut block);

        block.to_vec()
    }
}

impl Drop for EncryptState {
    fn drop(&mut self) {
        self.pending.zeroize();
    }
}

/// 解密方向的流式状态
pub struct DecryptState {
    cipher: Aes256CbcDec,
    pending: Vec<u8>,
}

impl DecryptState {
    pub fn new(params: &CipherParams) -> Result<Self> {
        let cipher = Aes256CbcDec::new_from_slices(&params.key[..], &params.iv[..])
            .map_err(|_| ChunkSealError::Cipher)?;

        Ok(Self {
            cipher,
            pending: Vec::with_capacity(BLOCK_SIZE),
        })
    }

    /// 送入一段密文，返回当前可确定的明文
    ///
    /// 输入对齐时最后一个完整块被保留，直到确认它不是最后一块。
    pub fn update(&mut self, input: &[u8]) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.pending);
        out.extend_from_slice(input);

        let mut keep = out.len() % BLOCK_SIZE;
        if keep == 0 && !out.is_empty() {
            keep = BLOCK_SIZE;
        }
        let split = out.len() - keep;
        self.pending = out.split_off(split);

        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher
                .decrypt_block_mut(GenericArray::from_mut_slice(block));
        }

        out
    }

    /// 解密保留的最后一块并去除填充
    ///
    /// 残余不是恰好一个块，或 PKCS#7 填充不合法时返回 `None`
    /// （通常意味着口令错误或密文被截断）。
    pub fn finalize(mut self) -> Option<Vec<u8>> {
        if self.pending.len() != BLOCK_SIZE {
            return None;
        }

        let mut block = GenericArray::<u8, U16>::clone_from_slice(&self.pending);
        self.cipher.decrypt_block_mut(&mut block);

        let plaintext = <Pkcs7 as Padding<U16>>::unpad(&block)
            .ok()
            .map(<[u8]>::to_vec);
        block.as_mut_slice().zeroize();

        plaintext
    }
}

impl Drop for DecryptState {
    fn drop(&mut self) {
        self.pending.zeroize();
    }
}
