use std::fmt;

use thiserror::Error;

use crate::fs::{BlockId, InodeId};

/// 耗尽的资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Blocks,
    Inodes,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocks => write!(f, "data blocks"),
            Self::Inodes => write!(f, "inodes"),
        }
    }
}

/// 文件系统错误类型
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// 底层 I/O 错误
    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// inode 记录编解码失败
    #[error("inode record encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("file or directory not found: {0}")]
    NotFound(String),

    #[error("file or directory already exists: {0}")]
    AlreadyExists(String),

    /// 数据块或 inode 已用完
    #[error("no free {0} left")]
    OutOfSpace(Resource),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// 对目录建立硬链接等被拒绝的操作
    #[error("operation not permitted: {0}")]
    NotPermitted(String),

    /// 结果超出调用接口能表示的范围
    #[error("value too large: {0}")]
    Overflow(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// 镜像太小，放不下保留区和至少一个数据块
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("block {0} is outside the data region")]
    InvalidBlock(BlockId),

    #[error("invalid inode: {0}")]
    InvalidInode(InodeId),

    #[error("file system corrupted: {0}")]
    Corrupted(String),
}

impl FileSystemError {
    /// 转换为 POSIX errno（正数），调用适配层取负后返回
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            Self::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
            Self::Encoding(_) => libc::EIO,
            Self::NotFound(_) => libc::ENOENT,
            Self::AlreadyExists(_) => libc::EEXIST,
            Self::OutOfSpace(_) => libc::ENOSPC,
            Self::Unsupported(_) => libc::ENOSYS,
            Self::NotPermitted(_) => libc::EPERM,
            Self::Overflow(_) => libc::EOVERFLOW,
            Self::NotADirectory(_) => libc::ENOTDIR,
            Self::InvalidPath(_) | Self::InvalidGeometry(_) => libc::EINVAL,
            Self::InvalidBlock(_) | Self::InvalidInode(_) | Self::Corrupted(_) => libc::EIO,
        }
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;
