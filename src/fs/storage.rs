//! 面向整个文件的操作，供调用适配层使用。

use log::warn;

use crate::{
    disk::BLOCK_SIZE,
    fs::{
        error::{FileSystemError, Result},
        mode::Mode,
        path::{at_path, components, split_parent},
        FileSystem, InodeId,
    },
    utils::current_timestamp,
};

/// 文件状态信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stat {
    pub inum: InodeId,
    pub size: u64,
    pub mode: u32,
    pub refs: u32,
    pub blocks: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl Stat {
    pub fn is_dir(&self) -> bool {
        Mode::from_bits_retain(self.mode).is_dir()
    }
}

impl FileSystem {
    pub fn stat(&self, path: &str) -> Result<Stat> {
        let inum = self.resolve(path)?;
        let inode = self.inodes.get(inum)?;
        Ok(Stat {
            inum,
            size: inode.size,
            mode: inode.mode,
            refs: inode.refs,
            blocks: inode.block_count(),
            atime: inode.atime,
            mtime: inode.mtime,
            ctime: inode.ctime,
        })
    }

    /// 存在性检查，同时刷新访问时间
    pub fn access(&mut self, path: &str) -> Result<()> {
        let inum = self.resolve(path)?;
        self.inodes.get_mut(inum)?.atime = current_timestamp();
        Ok(())
    }

    /// 从 `offset` 读入 `buf`，读到文件末尾为止，返回读到的字节数
    pub fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
        let inum = self.resolve(path)?;
        let inode = self.inodes.get(inum)?;
        if offset >= inode.size {
            return Ok(0);
        }
        let len = (inode.size - offset).min(buf.len() as u64) as usize;

        // 只做一次 translate，之后沿链前进
        let mut block_id = inode.translate(&self.blocks, offset)?;
        let mut done = 0;
        while done < len {
            let within = ((offset + done as u64) % BLOCK_SIZE as u64) as usize;
            let n = (len - done).min(BLOCK_SIZE - within);
            buf[done..done + n].copy_from_slice(&self.blocks.block(block_id)?[within..within + n]);
            done += n;
            if done < len {
                block_id = self.blocks.successor(block_id)?;
            }
        }
        Ok(len)
    }

    /// 写入 `buf`，超出当前长度时先增长文件，返回写入的字节数
    pub fn write(&mut self, path: &str, buf: &[u8], offset: u64) -> Result<usize> {
        let inum = self.resolve(path)?;
        if buf.is_empty() {
            return Ok(0);
        }

        let inode = self.inodes.get_mut(inum)?;
        let end = offset + buf.len() as u64;
        if end > inode.size {
            inode.grow(&mut self.blocks, end)?;
        }

        let mut block_id = inode.translate(&self.blocks, offset)?;
        let mut done = 0;
        while done < buf.len() {
            let within = ((offset + done as u64) % BLOCK_SIZE as u64) as usize;
            let n = (buf.len() - done).min(BLOCK_SIZE - within);
            self.blocks.get_block(block_id)?[within..within + n]
                .copy_from_slice(&buf[done..done + n]);
            done += n;
            if done < buf.len() {
                block_id = self.blocks.successor(block_id)?;
            }
        }

        inode.mtime = current_timestamp();
        Ok(buf.len())
    }

    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let inum = self.resolve(path)?;
        let inode = self.inodes.get_mut(inum)?;
        if size > inode.size {
            inode.grow(&mut self.blocks, size)?;
        } else {
            inode.shrink(&mut self.blocks, size)?;
        }
        inode.mtime = current_timestamp();
        Ok(())
    }

    /// 新建文件或目录（目录即 mode 带 DIRECTORY 位），返回新 inode 号
    pub fn create(&mut self, path: &str, mode: u32) -> Result<InodeId> {
        if self.exists(path)? {
            return Err(FileSystemError::AlreadyExists(path.to_string()));
        }
        let (parent, name) = split_parent(path)?;
        let parent_inum = self.resolve(&parent)?;

        let inum = self.inodes.alloc_inode(&mut self.blocks, mode)?;
        if let Err(err) = self.dir_insert(parent_inum, name, inum) {
            self.inodes.free_inode(&mut self.blocks, inum)?;
            return Err(at_path(&parent)(err));
        }
        Ok(inum)
    }

    /// 删除一个名字；最后一个名字消失时回收 inode
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent, name) = split_parent(path)?;
        let parent_inum = self.resolve(&parent)?;
        let inum = self.dir_lookup(parent_inum, name).map_err(at_path(path))?;

        // 非空目录的最后一个名字不能删，否则其中的 inode 无从回收
        let target = self.inodes.get(inum)?;
        if target.is_dir() && target.size > 0 && target.refs <= 1 {
            return Err(FileSystemError::Unsupported(format!(
                "unlink of non-empty directory {}",
                path
            )));
        }

        self.dir_delete(parent_inum, name).map_err(at_path(path))
    }

    /// 在 `link_path` 处新建一个指向 `target_path` 所在 inode 的名字
    pub fn link(&mut self, link_path: &str, target_path: &str) -> Result<()> {
        // 目录只能有一个名字，否则删掉其中一个就会让目录内容失去引用
        let inum = self.resolve(target_path)?;
        if self.inodes.get(inum)?.is_dir() {
            return Err(FileSystemError::NotPermitted(format!(
                "hard link to directory {}",
                target_path
            )));
        }
        self.link_entry(link_path, inum)
    }

    /// 在 `link_path` 处新增一个指向 `inum` 的目录项，并增加引用计数
    fn link_entry(&mut self, link_path: &str, inum: InodeId) -> Result<()> {
        if self.exists(link_path)? {
            return Err(FileSystemError::AlreadyExists(link_path.to_string()));
        }
        let (parent, name) = split_parent(link_path)?;
        let parent_inum = self.resolve(&parent)?;
        self.dir_insert(parent_inum, name, inum)
            .map_err(at_path(&parent))?;

        let inode = self.inodes.get_mut(inum)?;
        inode.inc_link();
        inode.ctime = current_timestamp();
        Ok(())
    }

    /// 先 link 新名字再 unlink 旧名字，不是原子操作：
    /// 第二步失败时两个名字同时存在，错误照常返回。
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from_parts: Vec<&str> = components(from).collect();
        let to_parts: Vec<&str> = components(to).collect();
        if to_parts.len() > from_parts.len() && to_parts.starts_with(&from_parts) {
            return Err(FileSystemError::InvalidPath(format!(
                "cannot move {} into itself ({})",
                from, to
            )));
        }

        let inum = self.resolve(from)?;
        self.link_entry(to, inum)?;
        if let Err(err) = self.unlink(from) {
            warn!(
                "rename({} => {}): unlink failed after link, both names remain: {}",
                from, to, err
            );
            return Err(err);
        }
        Ok(())
    }

    pub fn set_times(&mut self, path: &str, atime: i64, mtime: i64) -> Result<()> {
        let inum = self.resolve(path)?;
        let inode = self.inodes.get_mut(inum)?;
        inode.atime = atime;
        inode.mtime = mtime;
        Ok(())
    }

    pub fn update_change_time(&mut self, path: &str) -> Result<()> {
        let inum = self.resolve(path)?;
        self.inodes.get_mut(inum)?.ctime = current_timestamp();
        Ok(())
    }

    /// 只改权限位，类型位不动
    pub fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        let inum = self.resolve(path)?;
        let inode = self.inodes.get_mut(inum)?;
        inode.mode = inode.mode().with_permissions(mode).bits();
        Ok(())
    }

    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        let inum = self.resolve(path)?;
        self.dir_list(inum).map_err(at_path(path))
    }
}
