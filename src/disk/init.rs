use std::path::Path;

use log::info;

use crate::{
    disk::{
        block_device::BlockDevice,
        file_disk::FileDisk,
        types::{Block, BLOCK_SIZE},
    },
    fs::{config::BITMAP_START_BLOCK_ID, FileSystem, Result},
};

/// 打开镜像并挂载
///
/// 布局由镜像块数推导，所以已有文件系统的镜像保持原大小，`blocks`
/// 只在新建或重新格式化时生效。`force_format` 时无论镜像内容如何都重新格式化。
pub fn open_image<P: AsRef<Path>>(path: P, blocks: u64, force_format: bool) -> Result<FileSystem> {
    let path = path.as_ref();
    let mut disk = FileDisk::open_as_is(path)?;

    if force_format || !FileSystem::is_formatted(&disk)? {
        disk.extend_to(blocks)?;
        // 清掉 0 号块，挂载时按新镜像格式化
        let empty: Block = [0; BLOCK_SIZE];
        disk.write_block(u64::from(BITMAP_START_BLOCK_ID), &empty)?;
    } else if disk.block_count() != blocks {
        info!(
            "{} already holds a {}-block file system, ignoring requested {} blocks",
            path.display(),
            disk.block_count(),
            blocks
        );
    }
    info!("opened {} ({} blocks)", path.display(), disk.block_count());

    FileSystem::mount(Box::new(disk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopen_keeps_files_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("disk.img");

        let mut fs = open_image(&image, 64, false).unwrap();
        fs.create("/keep", 0o100644).unwrap();
        fs.unmount().unwrap();

        let fs = open_image(&image, 64, false).unwrap();
        assert!(fs.exists("/keep").unwrap());
        fs.unmount().unwrap();

        let fs = open_image(&image, 64, true).unwrap();
        assert!(!fs.exists("/keep").unwrap());
    }

    #[test]
    fn reopen_with_other_block_count_keeps_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("disk.img");

        let mut fs = open_image(&image, 64, false).unwrap();
        fs.create("/keep", 0o100644).unwrap();
        fs.write("/keep", b"still here", 0).unwrap();
        fs.unmount().unwrap();

        for blocks in [256, 16, 64] {
            let fs = open_image(&image, blocks, false).unwrap();
            assert_eq!(fs.layout().total_blocks, 64);
            let mut buf = [0u8; 10];
            assert_eq!(fs.read("/keep", &mut buf, 0).unwrap(), 10);
            assert_eq!(&buf, b"still here");
            fs.unmount().unwrap();
        }
        assert_eq!(
            std::fs::metadata(&image).unwrap().len(),
            64 * BLOCK_SIZE as u64
        );
    }

    #[test]
    fn forced_format_applies_new_block_count() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("disk.img");

        let mut fs = open_image(&image, 64, false).unwrap();
        fs.create("/gone", 0o100644).unwrap();
        fs.unmount().unwrap();

        let fs = open_image(&image, 128, true).unwrap();
        assert_eq!(fs.layout().total_blocks, 128);
        assert!(!fs.exists("/gone").unwrap());
    }

    #[test]
    fn unformatted_file_is_extended_and_formatted() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("disk.img");
        std::fs::write(&image, vec![0u8; 8 * BLOCK_SIZE]).unwrap();

        let fs = open_image(&image, 32, false).unwrap();
        assert_eq!(fs.layout().total_blocks, 32);
        assert!(fs.stat("/").unwrap().is_dir());
    }
}
