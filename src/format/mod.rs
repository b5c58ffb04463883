//! chunk 目录的磁盘布局：文件命名与目录枚举。

pub mod listing;
pub mod naming;
