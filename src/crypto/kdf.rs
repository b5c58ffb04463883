//! ChunkSeal 密钥派生函数（KDF）模块
//!
//! 本模块负责将用户输入的口令，通过 PBKDF2-HMAC-SHA256
//! 派生为 AES-256-CBC 所需的密钥与 IV。
//!
//! 兼容性约束：
//! - salt 为固定常量，迭代次数固定为 10,000
//! - key 与 IV 由两次独立的 PBKDF2 调用得到（仅输出长度不同）
//! - 参数必须逐字节复现，否则无法解开旧的 chunk 目录
//!
//! 已知弱点：
//! - 固定 salt 意味着同一口令在所有文件上派生出相同的 key / IV
//! - PBKDF2 第一个输出块与请求长度无关，因此 IV 恰好等于 key 的前 16 字节
//!
//! 输出：
//! - 32 字节密钥 + 16 字节 IV（离开作用域后自动清零）

use hmac::Hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{ChunkSealError, Result};

/// 派生密钥长度（256-bit）
pub const KEY_LEN: usize = 32;

/// CBC 初始向量长度（一个 AES 块）
pub const IV_LEN: usize = 16;

/// PBKDF2 迭代次数
pub const ITERATIONS: u32 = 10_000;

/// 固定 salt，包含结尾的 NUL 字节（共 7 字节）
pub const SALT: &[u8] = b"mysalt\0";

/// 一次 split / join 操作使用的密钥材料
///
/// 由消费它的 cipher state 独占，操作结束即被清零。
pub struct CipherParams {
    pub key: Zeroizing<[u8; KEY_LEN]>,
    pub iv: Zeroizing<[u8; IV_LEN]>,
}

impl std::fmt::Debug for CipherParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherParams").finish_non_exhaustive()
    }
}

/// 根据口令派生 key 与 IV
///
/// #### 参数
/// - `passphrase`：任意长度的字节串（允许为空）
///
/// #### 错误
/// - PBKDF2 原语报告失败时返回 ChunkSealError::KeyDerivationFailed
pub fn derive_key_and_iv(passphrase: &[u8]) -> Result<CipherParams> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let mut iv = Zeroizing::new([0u8; IV_LEN]);

    pbkdf2_into(passphrase, &mut key[..])?;
    pbkdf2_into(passphrase, &mut iv[..])?;

    Ok(CipherParams { key, iv })
}

fn pbkdf2_into(passphrase: &[u8], out: &mut [u8]) -> Result<()> {
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, SALT, ITERATIONS, out)
        .map_err(|_| ChunkSealError::KeyDerivationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_answer() {
        // PBKDF2-HMAC-SHA256("secret123", "mysalt\0", 10000, 32)
        let params = derive_key_and_iv(b"secret123").unwrap();
        let expected = "9ba504bca9fcd89dadac8fa4e070e35fa011705dc132b1a34fc07aab7672f1a9";

        assert_eq!(hex::encode(*params.key), expected);
        assert_eq!(hex::encode(*params.iv), &expected[..IV_LEN * 2]);
    }

    #[test]
    fn salt_includes_trailing_nul() {
        assert_eq!(SALT.len(), 7);
        assert_eq!(SALT.last(), Some(&0));
        assert_eq!(ITERATIONS, 10_000);
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_key_and_iv(b"secret123").unwrap();
        let b = derive_key_and_iv(b"secret123").unwrap();

        assert_eq!(*a.key, *b.key);
        assert_eq!(*a.iv, *b.iv);
    }

    #[test]
    fn different_passphrases_give_different_keys() {
        let a = derive_key_and_iv(b"secret123").unwrap();
        let b = derive_key_and_iv(b"secret124").unwrap();

        assert_ne!(*a.key, *b.key);
    }

    #[test]
    fn iv_is_prefix_of_key() {
        // 同 password / salt / 迭代次数下，PBKDF2 的第一个块相同
        let params = derive_key_and_iv(b"anything").unwrap();
        assert_eq!(&params.key[..IV_LEN], &params.iv[..]);
    }

    #[test]
    fn empty_passphrase_is_accepted() {
        let params = derive_key_and_iv(b"").unwrap();
        assert_ne!(*params.key, [0u8; KEY_LEN]);
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let params = derive_key_and_iv(b"secret123").unwrap();
        assert_eq!(format!("{params:?}"), "CipherParams { .. }");
    }
}
