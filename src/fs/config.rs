use crate::{
    disk::BLOCK_SIZE,
    fs::{
        error::{FileSystemError, Result},
        BlockId, InodeId,
    },
};

// 位图区固定从 0 号块开始：先是数据块位图，紧跟 inode 位图
pub const BITMAP_START_BLOCK_ID: BlockId = 0;

// 根目录固定使用 0 号 inode
pub const ROOT_INODE: InodeId = 0;
pub const ROOT_MODE: u32 = 0o040755;

// 每个 inode 记录 64 字节，一个 4KB 块可以存 64 个
pub const INODE_SIZE: usize = 64;

// 链表项：每个块一个 u32，指向同一链中的下一块
pub const CHAIN_ENTRY_SIZE: usize = 4;

// 目录项 64 字节：48 字节名字 + 4 字节 inode 号 + 12 字节保留
pub const DIR_NAME_LENGTH: usize = 48;
pub const DIR_ENTRY_SIZE: usize = 64;
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

/// 镜像的分区布局，由块总数推导，不单独落盘
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub total_blocks: u32,          // 镜像总块数
    pub total_inodes: u32,          // inode 槽位数（等于总块数）
    pub bitmap_blocks: u32,         // 两个位图共占的块数
    pub chain_start: BlockId,       // 链表区起始块号
    pub chain_blocks: u32,          // 链表区块数
    pub inode_table_start: BlockId, // inode 表起始块号
    pub inode_table_blocks: u32,    // inode 表块数
    pub data_start: BlockId,        // 数据区起始块号
}

impl Layout {
    pub fn new(total_blocks: u64) -> Result<Self> {
        let total_blocks = u32::try_from(total_blocks).map_err(|_| {
            FileSystemError::InvalidGeometry(format!("{} blocks is too many", total_blocks))
        })?;
        let total_inodes = total_blocks;

        let bitmap_bytes = 2 * Self::bitmap_bytes(total_blocks);
        let bitmap_blocks = Self::blocks_for_bytes(bitmap_bytes);
        let chain_blocks = Self::blocks_for_bytes(total_blocks as usize * CHAIN_ENTRY_SIZE);
        let inode_table_blocks = Self::blocks_for_bytes(total_inodes as usize * INODE_SIZE);

        let chain_start = BITMAP_START_BLOCK_ID + bitmap_blocks;
        let inode_table_start = chain_start + chain_blocks;
        let data_start = inode_table_start + inode_table_blocks;

        if data_start >= total_blocks {
            return Err(FileSystemError::InvalidGeometry(format!(
                "{} blocks cannot hold the {} reserved blocks and any data",
                total_blocks, data_start
            )));
        }

        Ok(Self {
            total_blocks,
            total_inodes,
            bitmap_blocks,
            chain_start,
            chain_blocks,
            inode_table_start,
            inode_table_blocks,
            data_start,
        })
    }

    /// 一个位图实例占用的字节数
    pub fn bitmap_bytes(bits: u32) -> usize {
        (bits as usize + 7) / 8
    }

    pub fn data_blocks(&self) -> u32 {
        self.total_blocks - self.data_start
    }

    fn blocks_for_bytes(bytes: usize) -> u32 {
        ((bytes + BLOCK_SIZE - 1) / BLOCK_SIZE) as u32
    }
}
