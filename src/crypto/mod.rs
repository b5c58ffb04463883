//! 密钥派生与流式 cipher。

pub mod cipher;
pub mod kdf;
