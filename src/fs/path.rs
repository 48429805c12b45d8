use crate::fs::{
    config::ROOT_INODE,
    error::{FileSystemError, Result},
    FileSystem, InodeId,
};

/// 路径中非空的各个分量
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|component| !component.is_empty())
}

/// 拆成父目录路径和最后一个分量："/a/b/c" -> ("/a/b", "c")
pub fn split_parent(path: &str) -> Result<(String, &str)> {
    let parts: Vec<&str> = components(path).collect();
    let (name, parent) = parts
        .split_last()
        .ok_or_else(|| FileSystemError::InvalidPath(path.to_string()))?;
    Ok((format!("/{}", parent.join("/")), name))
}

/// 把下层按名字或 inode 报告的错误改写为整条路径
pub(crate) fn at_path(path: &str) -> impl FnOnce(FileSystemError) -> FileSystemError + '_ {
    move |err| match err {
        FileSystemError::NotFound(_) => FileSystemError::NotFound(path.to_string()),
        FileSystemError::NotADirectory(_) => FileSystemError::NotADirectory(path.to_string()),
        other => other,
    }
}

impl FileSystem {
    /// 从根目录开始逐级查找；`""` 和 `"/"` 直接得到根目录
    pub fn resolve(&self, path: &str) -> Result<InodeId> {
        let mut inum = ROOT_INODE;
        for component in components(path) {
            inum = self.dir_lookup(inum, component).map_err(at_path(path))?;
        }
        Ok(inum)
    }

    /// 路径是否已存在；NotFound 以外的错误照常返回
    pub fn exists(&self, path: &str) -> Result<bool> {
        match self.resolve(path) {
            Ok(_) => Ok(true),
            Err(FileSystemError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    #[test]
    fn split_parent_cases() {
        assert_eq!(split_parent("/a").unwrap(), ("/".to_string(), "a"));
        assert_eq!(split_parent("/a/b/c").unwrap(), ("/a/b".to_string(), "c"));
        assert_eq!(split_parent("a//b/").unwrap(), ("/a".to_string(), "b"));
        assert!(matches!(
            split_parent("/"),
            Err(FileSystemError::InvalidPath(_))
        ));
    }

    #[test]
    fn root_resolves_without_lookup() {
        let fs = FileSystem::mount(Box::new(MemDisk::new(64))).unwrap();
        assert_eq!(fs.resolve("").unwrap(), ROOT_INODE);
        assert_eq!(fs.resolve("/").unwrap(), ROOT_INODE);
        assert_eq!(fs.resolve("//").unwrap(), ROOT_INODE);
    }

    #[test]
    fn nested_resolution_and_missing_segment() {
        let mut fs = FileSystem::mount(Box::new(MemDisk::new(64))).unwrap();
        let d = fs.alloc_inode(0o040755).unwrap();
        let f = fs.alloc_inode(0o100644).unwrap();
        fs.dir_insert(ROOT_INODE, "d", d).unwrap();
        fs.dir_insert(d, "f", f).unwrap();

        assert_eq!(fs.resolve("/d").unwrap(), d);
        assert_eq!(fs.resolve("/d/f").unwrap(), f);
        assert_eq!(fs.resolve("d/f/").unwrap(), f);

        match fs.resolve("/d/missing/f") {
            Err(FileSystemError::NotFound(path)) => assert_eq!(path, "/d/missing/f"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            fs.resolve("/d/f/x"),
            Err(FileSystemError::NotADirectory(_))
        ));
        assert!(!fs.exists("/nope").unwrap());
        assert!(fs.exists("/d").unwrap());
    }
}
