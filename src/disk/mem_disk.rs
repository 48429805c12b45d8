use std::{
    io::{Error, ErrorKind, Result},
    sync::Mutex,
};

use crate::disk::{
    block_device::BlockDevice,
    types::{Block, BLOCK_SIZE},
};

/// 完全位于内存中的磁盘，用于测试和临时镜像
#[derive(Debug)]
pub struct MemDisk {
    bytes: Mutex<Vec<u8>>,
    block_count: u64,
}

impl MemDisk {
    pub fn new(block_count: u64) -> Self {
        Self {
            bytes: Mutex::new(vec![0; block_count as usize * BLOCK_SIZE]),
            block_count,
        }
    }

    fn range(&self, block_id: u64) -> Result<std::ops::Range<usize>> {
        if block_id >= self.block_count {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("block {} beyond end of disk", block_id),
            ));
        }
        let start = block_id as usize * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        let range = self.range(block_id)?;
        let bytes = self
            .bytes
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "memory disk lock poisoned"))?;
        buf.copy_from_slice(&bytes[range]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        let range = self.range(block_id)?;
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "memory disk lock poisoned"))?;
        bytes[range].copy_from_slice(buf);
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }
}
