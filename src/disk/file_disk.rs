use std::{
    fs::{File, OpenOptions},
    io::{Error, ErrorKind, Read, Result, Seek, SeekFrom, Write},
    path::Path,
    sync::{Mutex, MutexGuard},
};

use log::info;

use crate::disk::{
    block_device::BlockDevice,
    types::{Block, BLOCK_SIZE},
};

/// 以宿主机上的一个镜像文件作为磁盘
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
    block_count: u64,
}

impl FileDisk {
    /// 打开（或创建）镜像文件；文件小于 `min_blocks` 块时扩展到该大小
    pub fn open<P: AsRef<Path>>(path: P, min_blocks: u64) -> Result<Self> {
        let mut disk = Self::open_as_is(path.as_ref())?;
        if disk.block_count < min_blocks {
            info!(
                "allocating {} blocks for {}",
                min_blocks,
                path.as_ref().display()
            );
            disk.extend_to(min_blocks)?;
        }
        Ok(disk)
    }

    /// 按文件现有长度打开，不改变大小；不存在时创建空文件
    pub fn open_as_is<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        let block_count = file.metadata()?.len() / BLOCK_SIZE as u64;
        Ok(Self {
            file: Mutex::new(file),
            block_count,
        })
    }

    /// 把镜像扩展到 `blocks` 块，已经够大时不变
    pub fn extend_to(&mut self, blocks: u64) -> Result<()> {
        if blocks <= self.block_count {
            return Ok(());
        }
        let file = self
            .file
            .get_mut()
            .map_err(|_| Error::new(ErrorKind::Other, "disk file lock poisoned"))?;
        file.set_len(blocks * BLOCK_SIZE as u64)?;
        self.block_count = blocks;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "disk file lock poisoned"))
    }

    fn check_range(&self, block_id: u64) -> Result<()> {
        if block_id >= self.block_count {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("block {} beyond end of disk", block_id),
            ));
        }
        Ok(())
    }
}

impl BlockDevice for FileDisk {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        self.check_range(block_id)?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id * BLOCK_SIZE as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        self.check_range(block_id)?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id * BLOCK_SIZE as u64))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }
}
