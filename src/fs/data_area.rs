use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::{
        error::{FileSystemError, Result},
        BlockId,
    },
};

/// 数据区：所有数据块内容的扁平化内存副本，按绝对块号寻址
#[derive(Debug, Clone)]
pub struct DataArea {
    blocks: Vec<u8>,      // 数据块
    total_blocks: u32,    // 块总数
    start_block: BlockId, // 起始块号
    dirty: Vec<bool>,     // 每个块是否被修改
}

impl DataArea {
    pub fn new(start_block: BlockId, total_blocks: u32) -> Self {
        Self {
            blocks: vec![0u8; total_blocks as usize * BLOCK_SIZE],
            total_blocks,
            start_block,
            dirty: vec![false; total_blocks as usize],
        }
    }

    pub fn contains(&self, block_id: BlockId) -> bool {
        block_id >= self.start_block && block_id - self.start_block < self.total_blocks
    }

    fn index(&self, block_id: BlockId) -> Result<usize> {
        if !self.contains(block_id) {
            return Err(FileSystemError::InvalidBlock(block_id));
        }
        Ok((block_id - self.start_block) as usize)
    }

    pub fn block(&self, block_id: BlockId) -> Result<&[u8]> {
        let start = self.index(block_id)? * BLOCK_SIZE;
        Ok(&self.blocks[start..start + BLOCK_SIZE])
    }

    /// 返回可写视图，并把该块标记为脏
    pub fn block_mut(&mut self, block_id: BlockId) -> Result<&mut [u8]> {
        let index = self.index(block_id)?;
        self.dirty[index] = true;
        let start = index * BLOCK_SIZE;
        Ok(&mut self.blocks[start..start + BLOCK_SIZE])
    }

    /// 把所有块标记为脏，下次 sync 时整区写回
    pub fn mark_all_dirty(&mut self) {
        self.dirty.fill(true);
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.iter().filter(|d| **d).count()
    }

    /// 只写回被修改过的块，返回写回的块数
    pub fn sync(&mut self, disk: &dyn BlockDevice) -> std::io::Result<usize> {
        let mut written = 0;
        let mut buf: Block = [0u8; BLOCK_SIZE];
        for i in 0..self.total_blocks as usize {
            if self.dirty[i] {
                let start = i * BLOCK_SIZE;
                buf.copy_from_slice(&self.blocks[start..start + BLOCK_SIZE]);
                disk.write_block(u64::from(self.start_block) + i as u64, &buf)?;
                self.dirty[i] = false;
                written += 1;
            }
        }
        Ok(written)
    }

    pub fn load(&mut self, disk: &dyn BlockDevice) -> std::io::Result<()> {
        let mut buf: Block = [0u8; BLOCK_SIZE];
        for i in 0..self.total_blocks as usize {
            disk.read_block(u64::from(self.start_block) + i as u64, &mut buf)?;
            let start = i * BLOCK_SIZE;
            self.blocks[start..start + BLOCK_SIZE].copy_from_slice(&buf);
            self.dirty[i] = false;
        }
        Ok(())
    }
}
