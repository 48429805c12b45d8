use std::io::Result;

use crate::disk::types::{Block, BLOCK_SIZE};

pub trait BlockDevice: Send + Sync {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()>;
    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()>;
    /// 设备包含的块总数
    fn block_count(&self) -> u64;

    /// 连续读取 `count` 个块，拼接成一段字节
    fn read_blocks(&self, start_block: u64, count: u64) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(count as usize * BLOCK_SIZE);
        let mut block_buf: Block = [0; BLOCK_SIZE];
        for i in 0..count {
            self.read_block(start_block + i, &mut block_buf)?;
            bytes.extend_from_slice(&block_buf);
        }
        Ok(bytes)
    }

    /// 从 `start_block` 开始写入一段字节，最后一块不足的部分用 0 填充
    fn write_blocks(&self, start_block: u64, bytes: &[u8]) -> Result<()> {
        let mut block_buf: Block = [0; BLOCK_SIZE];
        for (i, chunk) in bytes.chunks(BLOCK_SIZE).enumerate() {
            block_buf[..chunk.len()].copy_from_slice(chunk);
            block_buf[chunk.len()..].fill(0);
            self.write_block(start_block + i as u64, &block_buf)?;
        }
        Ok(())
    }
}
