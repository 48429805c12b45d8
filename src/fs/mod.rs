use log::info;

use crate::{
    disk::BlockDevice,
    fs::{
        bitmap::Bitmap,
        block_store::BlockStore,
        config::{Layout, BITMAP_START_BLOCK_ID, ROOT_INODE, ROOT_MODE},
        inode_table::InodeTable,
    },
};

pub mod bitmap;
pub mod block_store;
pub mod config;
pub mod data_area;
pub mod directory;
pub mod error;
pub mod inode_table;
pub mod mode;
pub mod path;
pub mod storage;

pub use error::{FileSystemError, Resource, Result};
pub use mode::Mode;
pub use storage::Stat;

pub type BlockId = u32;
pub type InodeId = u32;

/// 整个镜像的存储句柄；各层都通过它访问位图、链表、inode 表和数据区
pub struct FileSystem {
    disk: Box<dyn BlockDevice>, // 底层磁盘抽象层
    layout: Layout,             // 分区布局
    blocks: BlockStore,         // 数据块分配与内容
    inodes: InodeTable,         // 所有 inode 管理
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("layout", &self.layout)
            .field("free_blocks", &self.blocks.free_count())
            .field("free_inodes", &self.inodes.free_count())
            .finish()
    }
}

impl FileSystem {
    /// 挂载镜像；全新镜像（0 号块未被标记占用）会先格式化
    pub fn mount(disk: Box<dyn BlockDevice>) -> Result<Self> {
        let layout = Layout::new(disk.block_count())?;
        let region = disk.read_blocks(
            u64::from(BITMAP_START_BLOCK_ID),
            u64::from(layout.bitmap_blocks),
        )?;
        let bitmap_len = Layout::bitmap_bytes(layout.total_blocks);
        let block_bitmap = Bitmap::from_bytes(&region[..bitmap_len], layout.total_blocks);
        let inode_bitmap = Bitmap::from_bytes(
            &region[bitmap_len..2 * bitmap_len],
            layout.total_inodes,
        );

        if !block_bitmap.is_used(BITMAP_START_BLOCK_ID) {
            info!("no file system found, formatting {} blocks", layout.total_blocks);
            let mut fs = Self {
                blocks: BlockStore::format(&layout),
                inodes: InodeTable::new(&layout),
                disk,
                layout,
            };
            fs.init_root()?;
            fs.sync()?;
            return Ok(fs);
        }

        let blocks = BlockStore::load(disk.as_ref(), &layout, block_bitmap)?;
        let inodes = InodeTable::load(disk.as_ref(), &layout, inode_bitmap)?;
        let mut fs = Self {
            disk,
            layout,
            blocks,
            inodes,
        };

        // 根目录的头块就是第一个数据块
        if !fs.blocks.is_allocated(layout.data_start) {
            info!("root directory missing, initializing");
            fs.init_root()?;
            fs.sync()?;
        }

        info!(
            "mounted: {} blocks, {} free blocks, {} free inodes",
            layout.total_blocks,
            fs.blocks.free_count(),
            fs.inodes.free_count()
        );
        Ok(fs)
    }

    /// 磁盘上是否已有文件系统：0 号块在数据块位图中被标记占用
    pub fn is_formatted(disk: &dyn BlockDevice) -> Result<bool> {
        if disk.block_count() == 0 {
            return Ok(false);
        }
        let head = disk.read_blocks(u64::from(BITMAP_START_BLOCK_ID), 1)?;
        Ok(Bitmap::from_bytes(&head[..1], 8).is_used(BITMAP_START_BLOCK_ID))
    }

    /// 写回所有状态并归还磁盘
    pub fn unmount(mut self) -> Result<Box<dyn BlockDevice>> {
        self.sync()?;
        Ok(self.disk)
    }

    /// 清空整个文件系统，只留下空的根目录
    pub fn format(&mut self) -> Result<()> {
        info!("formatting {} blocks", self.layout.total_blocks);
        self.blocks = BlockStore::format(&self.layout);
        self.inodes = InodeTable::new(&self.layout);
        self.init_root()?;
        self.sync()
    }

    fn init_root(&mut self) -> Result<()> {
        let root = self.inodes.alloc_inode(&mut self.blocks, ROOT_MODE)?;
        if root != ROOT_INODE {
            return Err(FileSystemError::Corrupted(format!(
                "root directory allocated as inode {}",
                root
            )));
        }
        Ok(())
    }

    /// 位图区、链表区、inode 表和脏数据块全部写回磁盘
    pub fn sync(&mut self) -> Result<()> {
        let mut region = Vec::with_capacity(2 * Layout::bitmap_bytes(self.layout.total_blocks));
        region.extend_from_slice(self.blocks.bitmap().as_bytes());
        region.extend_from_slice(self.inodes.bitmap().as_bytes());
        self.disk
            .write_blocks(u64::from(BITMAP_START_BLOCK_ID), &region)?;

        let written = self.blocks.sync(self.disk.as_ref(), &self.layout)?;
        self.inodes.sync(self.disk.as_ref())?;
        info!("sync: {} data blocks written", written);
        Ok(())
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn free_blocks(&self) -> u32 {
        self.blocks.free_count()
    }

    pub fn free_inodes(&self) -> u32 {
        self.inodes.free_count()
    }

    pub fn alloc_block(&mut self) -> Result<BlockId> {
        self.blocks.allocate_block()
    }

    pub fn free_block(&mut self, block_id: BlockId) {
        self.blocks.free_block(block_id)
    }

    pub fn get_block(&mut self, block_id: BlockId) -> Result<&mut [u8]> {
        self.blocks.get_block(block_id)
    }

    pub fn alloc_inode(&mut self, mode: u32) -> Result<InodeId> {
        self.inodes.alloc_inode(&mut self.blocks, mode)
    }

    pub fn free_inode(&mut self, inum: InodeId) -> Result<()> {
        self.inodes.free_inode(&mut self.blocks, inum)
    }
}
