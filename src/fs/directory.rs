//! 目录：目录项以定长记录的形式存放在目录 inode 的数据里。
//!
//! 第 i 个目录项位于目录数据的 `i * DIR_ENTRY_SIZE` 字节处，目录项个数
//! 等于 `size / DIR_ENTRY_SIZE`。目录的块链和普通文件一样按需增长。

use crate::{
    disk::BLOCK_SIZE,
    fs::{
        block_store::BlockStore,
        config::{DIR_ENTRY_SIZE, DIR_NAME_LENGTH},
        error::{FileSystemError, Result},
        inode_table::Inode,
        FileSystem, InodeId,
    },
    utils::current_timestamp,
};

const INUM_OFFSET: usize = DIR_NAME_LENGTH;

/// 一个目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inum: InodeId,
}

impl DirEntry {
    pub fn new(name: &str, inum: InodeId) -> Self {
        Self {
            name: stored_name(name).to_string(),
            inum,
        }
    }

    /// 名字占满 48 字节时没有结尾的 0
    pub fn encode(&self, slot: &mut [u8]) {
        slot[..DIR_ENTRY_SIZE].fill(0);
        let name = self.name.as_bytes();
        slot[..name.len()].copy_from_slice(name);
        slot[INUM_OFFSET..INUM_OFFSET + 4].copy_from_slice(&self.inum.to_le_bytes());
    }

    pub fn decode(slot: &[u8]) -> Self {
        let raw = &slot[..DIR_NAME_LENGTH];
        let len = raw.iter().position(|b| *b == 0).unwrap_or(DIR_NAME_LENGTH);
        let inum = u32::from_le_bytes([
            slot[INUM_OFFSET],
            slot[INUM_OFFSET + 1],
            slot[INUM_OFFSET + 2],
            slot[INUM_OFFSET + 3],
        ]);
        Self {
            name: String::from_utf8_lossy(&raw[..len]).into_owned(),
            inum,
        }
    }
}

/// 超过 48 字节的名字在字符边界处截断
pub fn stored_name(name: &str) -> &str {
    if name.len() <= DIR_NAME_LENGTH {
        return name;
    }
    let mut end = DIR_NAME_LENGTH;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

// 把第 index 个目录项写进目录数据
fn put_entry(blocks: &mut BlockStore, dir: &Inode, index: usize, entry: &DirEntry) -> Result<()> {
    let offset = (index * DIR_ENTRY_SIZE) as u64;
    let block_id = dir.translate(blocks, offset)?;
    let start = (offset % BLOCK_SIZE as u64) as usize;
    entry.encode(&mut blocks.get_block(block_id)?[start..start + DIR_ENTRY_SIZE]);
    Ok(())
}

impl FileSystem {
    fn directory(&self, dir: InodeId) -> Result<&Inode> {
        let inode = self.inodes.get(dir)?;
        if !inode.is_dir() {
            return Err(FileSystemError::NotADirectory(format!("inode {}", dir)));
        }
        Ok(inode)
    }

    /// 按存放顺序读出全部目录项
    pub fn dir_entries(&self, dir: InodeId) -> Result<Vec<DirEntry>> {
        let inode = self.directory(dir)?;
        let count = (inode.size / DIR_ENTRY_SIZE as u64) as usize;
        let mut entries = Vec::with_capacity(count);

        'chain: for block_id in self.blocks.chain(inode.block) {
            for slot in self.blocks.block(block_id)?.chunks_exact(DIR_ENTRY_SIZE) {
                if entries.len() == count {
                    break 'chain;
                }
                entries.push(DirEntry::decode(slot));
            }
        }

        if entries.len() < count {
            return Err(FileSystemError::Corrupted(format!(
                "directory inode {} holds {} of {} entries",
                dir,
                entries.len(),
                count
            )));
        }
        Ok(entries)
    }

    /// 空名字直接返回 NotFound，不与任何目录项比较
    pub fn dir_lookup(&self, dir: InodeId, name: &str) -> Result<InodeId> {
        if name.is_empty() {
            return Err(FileSystemError::NotFound(String::new()));
        }
        let wanted = stored_name(name);
        self.dir_entries(dir)?
            .into_iter()
            .find(|entry| entry.name == wanted)
            .map(|entry| entry.inum)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))
    }

    /// 在末尾追加目录项；不检查重名，调用方需先确认名字不存在
    pub fn dir_insert(&mut self, dir: InodeId, name: &str, inum: InodeId) -> Result<()> {
        if name.is_empty() {
            return Err(FileSystemError::InvalidPath(String::new()));
        }
        let size = self.directory(dir)?.size;
        let index = (size / DIR_ENTRY_SIZE as u64) as usize;

        let inode = self.inodes.get_mut(dir)?;
        inode.grow(&mut self.blocks, size + DIR_ENTRY_SIZE as u64)?;
        put_entry(&mut self.blocks, inode, index, &DirEntry::new(name, inum))?;

        let now = current_timestamp();
        inode.mtime = now;
        inode.ctime = now;
        Ok(())
    }

    /// 删除目录项：目标 inode 引用计数减一（降为 0 时回收），
    /// 后面的目录项前移一格
    pub fn dir_delete(&mut self, dir: InodeId, name: &str) -> Result<()> {
        let mut entries = self.dir_entries(dir)?;
        let wanted = stored_name(name);
        let index = entries
            .iter()
            .position(|entry| !name.is_empty() && entry.name == wanted)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;
        let removed = entries.remove(index);

        let target = self.inodes.get_mut(removed.inum)?;
        target.dec_link();
        if target.refs == 0 {
            self.inodes.free_inode(&mut self.blocks, removed.inum)?;
        } else {
            target.ctime = current_timestamp();
        }

        let inode = self.inodes.get_mut(dir)?;
        for (i, entry) in entries.iter().enumerate().skip(index) {
            put_entry(&mut self.blocks, inode, i, entry)?;
        }
        inode.shrink(&mut self.blocks, (entries.len() * DIR_ENTRY_SIZE) as u64)?;

        let now = current_timestamp();
        inode.mtime = now;
        inode.ctime = now;
        Ok(())
    }

    /// 目录中所有名字，按插入顺序
    pub fn dir_list(&self, dir: InodeId) -> Result<Vec<String>> {
        Ok(self
            .dir_entries(dir)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disk::MemDisk,
        fs::config::{DIR_ENTRIES_PER_BLOCK, ROOT_INODE},
    };

    fn mounted() -> FileSystem {
        FileSystem::mount(Box::new(MemDisk::new(64))).unwrap()
    }

    #[test]
    fn entry_codec_truncates_long_names() {
        let long = "n".repeat(60);
        let entry = DirEntry::new(&long, 9);
        assert_eq!(entry.name.len(), DIR_NAME_LENGTH);

        let mut slot = [0xFFu8; DIR_ENTRY_SIZE];
        entry.encode(&mut slot);
        assert_eq!(DirEntry::decode(&slot), entry);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let name = format!("{}é", "a".repeat(47));
        assert_eq!(stored_name(&name), "a".repeat(47));
    }

    #[test]
    fn insert_lookup_list_in_order() {
        let mut fs = mounted();
        let a = fs.alloc_inode(0o100644).unwrap();
        let b = fs.alloc_inode(0o100644).unwrap();
        fs.dir_insert(ROOT_INODE, "a", a).unwrap();
        fs.dir_insert(ROOT_INODE, "b", b).unwrap();

        assert_eq!(fs.dir_lookup(ROOT_INODE, "a").unwrap(), a);
        assert_eq!(fs.dir_lookup(ROOT_INODE, "b").unwrap(), b);
        assert_eq!(fs.dir_list(ROOT_INODE).unwrap(), vec!["a", "b"]);
        assert_eq!(
            fs.inodes.get(ROOT_INODE).unwrap().size,
            2 * DIR_ENTRY_SIZE as u64
        );
    }

    #[test]
    fn empty_name_never_matches() {
        let fs = mounted();
        assert!(matches!(
            fs.dir_lookup(ROOT_INODE, ""),
            Err(FileSystemError::NotFound(_))
        ));
    }

    #[test]
    fn delete_compacts_and_reclaims() {
        let mut fs = mounted();
        let free_blocks = fs.free_blocks();
        let inums: Vec<_> = (0..3).map(|_| fs.alloc_inode(0o100644).unwrap()).collect();
        for (name, inum) in ["x", "y", "z"].iter().zip(&inums) {
            fs.dir_insert(ROOT_INODE, name, *inum).unwrap();
        }

        fs.dir_delete(ROOT_INODE, "x").unwrap();
        assert_eq!(fs.dir_list(ROOT_INODE).unwrap(), vec!["y", "z"]);
        assert_eq!(fs.dir_lookup(ROOT_INODE, "z").unwrap(), inums[2]);
        assert!(!fs.inodes.is_allocated(inums[0]));

        fs.dir_delete(ROOT_INODE, "y").unwrap();
        fs.dir_delete(ROOT_INODE, "z").unwrap();
        assert!(fs.dir_list(ROOT_INODE).unwrap().is_empty());
        assert_eq!(fs.free_blocks(), free_blocks);

        assert!(matches!(
            fs.dir_delete(ROOT_INODE, "x"),
            Err(FileSystemError::NotFound(_))
        ));
    }

    #[test]
    fn delete_keeps_inode_with_other_links() {
        let mut fs = mounted();
        let inum = fs.alloc_inode(0o100644).unwrap();
        fs.dir_insert(ROOT_INODE, "one", inum).unwrap();
        fs.dir_insert(ROOT_INODE, "two", inum).unwrap();
        fs.inodes.get_mut(inum).unwrap().inc_link();

        fs.dir_delete(ROOT_INODE, "one").unwrap();
        assert_eq!(fs.inodes.get(inum).unwrap().refs, 1);
        assert_eq!(fs.dir_lookup(ROOT_INODE, "two").unwrap(), inum);
    }

    #[test]
    fn directory_grows_past_one_block() {
        let mut fs = FileSystem::mount(Box::new(MemDisk::new(256))).unwrap();
        let inum = fs.alloc_inode(0o100644).unwrap();
        let count = DIR_ENTRIES_PER_BLOCK + 3;
        for i in 0..count {
            fs.dir_insert(ROOT_INODE, &format!("f{}", i), inum).unwrap();
        }
        let root = fs.inodes.get(ROOT_INODE).unwrap();
        assert_eq!(fs.blocks.chain(root.block).count(), 2);
        assert_eq!(fs.dir_list(ROOT_INODE).unwrap().len(), count);
        assert_eq!(
            fs.dir_lookup(ROOT_INODE, &format!("f{}", count - 1)).unwrap(),
            inum
        );
    }

    #[test]
    fn file_inode_is_not_a_directory() {
        let mut fs = mounted();
        let inum = fs.alloc_inode(0o100644).unwrap();
        assert!(matches!(
            fs.dir_lookup(inum, "x"),
            Err(FileSystemError::NotADirectory(_))
        ));
        assert!(matches!(
            fs.dir_insert(inum, "x", inum),
            Err(FileSystemError::NotADirectory(_))
        ));
    }
}
