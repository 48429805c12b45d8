use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, BLOCK_SIZE},
    fs::{
        bitmap::Bitmap,
        block_store::BlockStore,
        config::{Layout, INODE_SIZE},
        error::{FileSystemError, Resource, Result},
        mode::Mode,
        BlockId, InodeId,
    },
    utils::current_timestamp,
};

/// 覆盖 `size` 字节需要的块数；链至少有一个头块
pub fn blocks_for(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE as u64).max(1)
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Inode {
    pub refs: u32,      // 硬链接数（有多少目录项指向该 inode）
    pub mode: u32,      // 类型与权限位
    pub size: u64,      // 文件大小（字节）
    pub block: BlockId, // 块链的头块号
    pub atime: i64,     // 最后访问时间（Access Time）
    pub mtime: i64,     // 最后修改时间（Modify Time）
    pub ctime: i64,     // 状态改变时间（Change Time）
}

impl Inode {
    pub fn new(mode: u32, head: BlockId) -> Self {
        let now = current_timestamp();
        Self {
            refs: 1,
            mode,
            size: 0,
            block: head,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_bits_retain(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.mode().is_dir()
    }

    pub fn block_count(&self) -> u64 {
        blocks_for(self.size)
    }

    // 增加/减少硬链接计数
    pub fn inc_link(&mut self) {
        self.refs += 1;
    }

    pub fn dec_link(&mut self) {
        self.refs = self.refs.saturating_sub(1);
    }

    /// 在链尾追加新块直到能覆盖 `target` 字节，然后更新 size
    ///
    /// 分配中途失败时，本次追加的块全部退回，inode 保持原状。
    pub fn grow(&mut self, blocks: &mut BlockStore, target: u64) -> Result<()> {
        let have = blocks_for(self.size);
        let need = blocks_for(target);

        if need > have {
            let old_tail = blocks.tail(self.block)?;
            let mut tail = old_tail;
            for _ in have..need {
                match blocks.allocate_block() {
                    Ok(block_id) => {
                        blocks.set_next(tail, block_id);
                        tail = block_id;
                    }
                    Err(err) => {
                        if tail != old_tail {
                            let appended = blocks.next(old_tail);
                            blocks.free_chain(appended);
                        }
                        blocks.set_next(old_tail, old_tail);
                        return Err(err);
                    }
                }
            }
        }

        self.size = target;
        Ok(())
    }

    /// 只保留覆盖 `target` 字节所需的块，其余块释放；头块始终保留
    pub fn shrink(&mut self, blocks: &mut BlockStore, target: u64) -> Result<()> {
        if target >= self.size {
            return Ok(());
        }

        let keep = blocks_for(target);
        let mut tail = self.block;
        for _ in 1..keep {
            tail = blocks.next(tail);
        }

        let rest = blocks.next(tail);
        if rest != tail {
            blocks.set_next(tail, tail);
            blocks.free_chain(rest);
        }

        // 保留块中超出新长度的部分清零，之后再增长时读到的是 0
        let within_tail = (target - (keep - 1) * BLOCK_SIZE as u64) as usize;
        blocks.zero_range(tail, within_tail)?;

        self.size = target;
        Ok(())
    }

    /// 逻辑字节偏移 -> 物理块号，从头块沿链走 `offset / BLOCK_SIZE` 步
    pub fn translate(&self, blocks: &BlockStore, offset: u64) -> Result<BlockId> {
        let steps = offset / BLOCK_SIZE as u64;
        let mut block_id = self.block;
        for _ in 0..steps {
            block_id = blocks.successor(block_id)?;
        }
        Ok(block_id)
    }
}

#[derive(Debug, Clone)]
pub struct InodeTable {
    bitmap: Bitmap,       // inode 分配信息
    inodes: Vec<Inode>,   // 所有 inode 记录
    start_block: BlockId, // inode 表在磁盘中的起始块号
}

impl InodeTable {
    pub fn new(layout: &Layout) -> Self {
        Self {
            bitmap: Bitmap::new(layout.total_inodes),
            inodes: vec![Inode::default(); layout.total_inodes as usize],
            start_block: layout.inode_table_start,
        }
    }

    /// 读取固定长度的 inode 记录，位图由调用方从位图区解析后传入
    pub fn load(disk: &dyn BlockDevice, layout: &Layout, bitmap: Bitmap) -> Result<Self> {
        let bytes = disk.read_blocks(
            u64::from(layout.inode_table_start),
            u64::from(layout.inode_table_blocks),
        )?;
        let inodes = bytes
            .chunks_exact(INODE_SIZE)
            .take(layout.total_inodes as usize)
            .map(bincode::deserialize::<Inode>)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // 已分配 inode 的头块必须落在数据区内
        if let Some((inum, inode)) = inodes.iter().enumerate().find(|(inum, inode)| {
            bitmap.is_used(*inum as InodeId)
                && (inode.block < layout.data_start || inode.block >= layout.total_blocks)
        }) {
            return Err(FileSystemError::Corrupted(format!(
                "inode {} starts at block {} outside the data region",
                inum, inode.block
            )));
        }

        Ok(Self {
            bitmap,
            inodes,
            start_block: layout.inode_table_start,
        })
    }

    pub fn sync(&self, disk: &dyn BlockDevice) -> Result<()> {
        let mut bytes = vec![0u8; self.inodes.len() * INODE_SIZE];
        for (inode, slot) in self.inodes.iter().zip(bytes.chunks_exact_mut(INODE_SIZE)) {
            bincode::serialize_into(slot, inode)?;
        }
        disk.write_blocks(u64::from(self.start_block), &bytes)?;
        Ok(())
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn free_count(&self) -> u32 {
        self.bitmap.free_count()
    }

    pub fn is_allocated(&self, inum: InodeId) -> bool {
        self.bitmap.is_used(inum)
    }

    /// 分配 inode 槽位和一个头块；头块分配失败时槽位退回
    pub fn alloc_inode(&mut self, blocks: &mut BlockStore, mode: u32) -> Result<InodeId> {
        let inum = self
            .bitmap
            .alloc()
            .ok_or(FileSystemError::OutOfSpace(Resource::Inodes))?;
        let head = match blocks.allocate_block() {
            Ok(head) => head,
            Err(err) => {
                self.bitmap.free(inum);
                return Err(err);
            }
        };
        self.inodes[inum as usize] = Inode::new(mode, head);
        debug!("alloc_inode() -> {}", inum);
        Ok(inum)
    }

    /// 释放整条块链和 inode 槽位；只在 refs 降为 0 后调用
    pub fn free_inode(&mut self, blocks: &mut BlockStore, inum: InodeId) -> Result<()> {
        debug!("free_inode({})", inum);
        let inode = self.get_mut(inum)?;
        inode.shrink(blocks, 0)?;
        blocks.free_block(inode.block);
        *inode = Inode::default();
        self.bitmap.free(inum);
        Ok(())
    }

    pub fn get(&self, inum: InodeId) -> Result<&Inode> {
        if !self.bitmap.is_used(inum) {
            return Err(FileSystemError::InvalidInode(inum));
        }
        self.inodes
            .get(inum as usize)
            .ok_or(FileSystemError::InvalidInode(inum))
    }

    pub fn get_mut(&mut self, inum: InodeId) -> Result<&mut Inode> {
        if !self.bitmap.is_used(inum) {
            return Err(FileSystemError::InvalidInode(inum));
        }
        self.inodes
            .get_mut(inum as usize)
            .ok_or(FileSystemError::InvalidInode(inum))
    }
}
