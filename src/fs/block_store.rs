//! 块存储：数据块位图、链表（块号 -> 同一链中的下一块号）和数据区。
//!
//! 链表是一张与块号平行的索引数组，类似 FAT：某项等于自身块号表示链尾。
//! 空闲块的链表项同样指向自身。

use log::debug;

use crate::{
    disk::{BlockDevice, BLOCK_SIZE},
    fs::{
        bitmap::Bitmap,
        config::{Layout, CHAIN_ENTRY_SIZE},
        data_area::DataArea,
        error::{FileSystemError, Resource, Result},
        BlockId,
    },
};

#[derive(Debug, Clone)]
pub struct BlockStore {
    bitmap: Bitmap,      // 数据块分配信息
    chain: Vec<BlockId>, // 链表
    data: DataArea,      // 数据块内容
}

impl BlockStore {
    /// 全新的块存储：保留区的块标记为已占用
    pub fn format(layout: &Layout) -> Self {
        let mut bitmap = Bitmap::new(layout.total_blocks);
        for block_id in 0..layout.data_start {
            bitmap.set_used(block_id);
        }

        let mut data = DataArea::new(layout.data_start, layout.data_blocks());
        data.mark_all_dirty();

        Self {
            bitmap,
            chain: (0..layout.total_blocks).collect(),
            data,
        }
    }

    /// 从磁盘加载链表和数据区，位图由调用方从位图区解析后传入
    pub fn load(disk: &dyn BlockDevice, layout: &Layout, bitmap: Bitmap) -> Result<Self> {
        let bytes = disk.read_blocks(
            u64::from(layout.chain_start),
            u64::from(layout.chain_blocks),
        )?;
        let chain = bytes
            .chunks_exact(CHAIN_ENTRY_SIZE)
            .take(layout.total_blocks as usize)
            .map(|raw| u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect::<Vec<_>>();

        if let Some((block_id, next)) = chain
            .iter()
            .enumerate()
            .find(|(_, next)| **next >= layout.total_blocks)
        {
            return Err(FileSystemError::Corrupted(format!(
                "chain entry of block {} points past the end of the image ({})",
                block_id, next
            )));
        }

        let mut data = DataArea::new(layout.data_start, layout.data_blocks());
        data.load(disk)?;

        Ok(Self {
            bitmap,
            chain,
            data,
        })
    }

    /// 写回链表区和脏数据块，返回写回的数据块数
    pub fn sync(&mut self, disk: &dyn BlockDevice, layout: &Layout) -> Result<usize> {
        let bytes: Vec<u8> = self
            .chain
            .iter()
            .flat_map(|next| next.to_le_bytes())
            .collect();
        disk.write_blocks(u64::from(layout.chain_start), &bytes)?;
        Ok(self.data.sync(disk)?)
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn free_count(&self) -> u32 {
        self.bitmap.free_count()
    }

    pub fn is_allocated(&self, block_id: BlockId) -> bool {
        self.bitmap.is_used(block_id)
    }

    /// 分配编号最小的空闲块，清零后作为一条单块链返回
    pub fn allocate_block(&mut self) -> Result<BlockId> {
        let block_id = self
            .bitmap
            .alloc()
            .ok_or(FileSystemError::OutOfSpace(Resource::Blocks))?;
        self.chain[block_id as usize] = block_id;
        self.data.block_mut(block_id)?.fill(0);
        debug!("alloc_block() -> {}", block_id);
        Ok(block_id)
    }

    /// 释放一个块；不检查该块是否仍被某条链引用
    pub fn free_block(&mut self, block_id: BlockId) {
        debug!("free_block({})", block_id);
        self.bitmap.free(block_id);
        if let Some(next) = self.chain.get_mut(block_id as usize) {
            *next = block_id;
        }
    }

    pub fn block(&self, block_id: BlockId) -> Result<&[u8]> {
        self.data.block(block_id)
    }

    /// 直接指向镜像内该块的可写视图，长度为 BLOCK_SIZE
    pub fn get_block(&mut self, block_id: BlockId) -> Result<&mut [u8]> {
        self.data.block_mut(block_id)
    }

    pub fn next(&self, block_id: BlockId) -> BlockId {
        self.chain[block_id as usize]
    }

    pub fn set_next(&mut self, block_id: BlockId, next: BlockId) {
        self.chain[block_id as usize] = next;
    }

    /// 链中的下一块；已经是链尾时视为链表损坏
    pub fn successor(&self, block_id: BlockId) -> Result<BlockId> {
        let next = self.next(block_id);
        if next == block_id {
            return Err(FileSystemError::Corrupted(format!(
                "chain ends at block {}",
                block_id
            )));
        }
        Ok(next)
    }

    pub fn is_tail(&self, block_id: BlockId) -> bool {
        self.next(block_id) == block_id
    }

    /// 从 `head` 开始依次遍历一条链
    pub fn chain(&self, head: BlockId) -> Chain<'_> {
        Chain {
            store: self,
            cursor: Some(head),
            remaining: self.chain.len(),
        }
    }

    /// 找到链尾
    pub fn tail(&self, head: BlockId) -> Result<BlockId> {
        self.chain(head)
            .last()
            .ok_or_else(|| FileSystemError::Corrupted(format!("empty chain at {}", head)))
    }

    /// 释放从 `start` 开始直到链尾的所有块
    pub fn free_chain(&mut self, start: BlockId) {
        let mut cursor = start;
        for _ in 0..self.chain.len() {
            let next = self.next(cursor);
            self.free_block(cursor);
            if next == cursor {
                return;
            }
            cursor = next;
        }
    }

    pub fn zero_range(&mut self, block_id: BlockId, from: usize) -> Result<()> {
        if from < BLOCK_SIZE {
            self.get_block(block_id)?[from..].fill(0);
        }
        Ok(())
    }
}

/// 链遍历器；步数以块总数为上限，损坏的环不会导致死循环
pub struct Chain<'a> {
    store: &'a BlockStore,
    cursor: Option<BlockId>,
    remaining: usize,
}

impl Iterator for Chain<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        let current = self.cursor?;
        if self.remaining == 0 {
            self.cursor = None;
            return None;
        }
        self.remaining -= 1;
        let next = self.store.next(current);
        self.cursor = (next != current).then_some(next);
        Some(current)
    }
}
