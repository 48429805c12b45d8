//! 系统调用风格的适配层：每个调用返回非负结果或负的 errno。

use libc::c_int;
use log::info;

use crate::fs::{FileSystem, FileSystemError, Mode, Result, Stat};

fn code(result: Result<c_int>) -> c_int {
    match result {
        Ok(value) => value,
        Err(err) => -err.to_errno(),
    }
}

fn offset_of(offset: i64) -> Result<u64> {
    u64::try_from(offset).map_err(|_| FileSystemError::InvalidPath(format!("offset {}", offset)))
}

/// 读写的字节数要能放进返回值
fn byte_count(n: usize) -> Result<c_int> {
    c_int::try_from(n).map_err(|_| FileSystemError::Overflow(format!("{} bytes", n)))
}

/// 按调用分派到文件系统，修改类调用结束后立即写回镜像
pub struct Operations {
    fs: FileSystem,
}

impl Operations {
    pub fn new(fs: FileSystem) -> Self {
        Self { fs }
    }

    pub fn fs(&self) -> &FileSystem {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut FileSystem {
        &mut self.fs
    }

    pub fn into_inner(self) -> FileSystem {
        self.fs
    }

    // 修改成功后才写回；写回失败时报告写回的错误
    fn commit<T>(&mut self, result: Result<T>) -> Result<T> {
        let value = result?;
        self.fs.sync()?;
        Ok(value)
    }

    pub fn access(&mut self, path: &str, mask: c_int) -> c_int {
        let result = self.fs.access(path).map(|_| 0);
        let rv = code(self.commit(result));
        info!("access({}, {:04o}) -> {}", path, mask, rv);
        rv
    }

    pub fn getattr(&mut self, path: &str, st: &mut Stat) -> c_int {
        let rv = code(self.fs.stat(path).map(|stat| {
            *st = stat;
            0
        }));
        info!(
            "getattr({}) -> ({}) {{mode: {:04o}, size: {}}}",
            path, rv, st.mode, st.size
        );
        rv
    }

    /// 先填入 "."，再按目录顺序填入每个名字及其状态
    pub fn readdir<F>(&mut self, path: &str, mut filler: F) -> c_int
    where
        F: FnMut(&str, &Stat),
    {
        let result = self.fs.stat(path).and_then(|dir| {
            filler(".", &dir);
            let base = path.trim_end_matches('/');
            for name in self.fs.list(path)? {
                let stat = self.fs.stat(&format!("{}/{}", base, name))?;
                filler(&name, &stat);
            }
            Ok(0)
        });
        let rv = code(result);
        info!("readdir({}) -> {}", path, rv);
        rv
    }

    pub fn mknod(&mut self, path: &str, mode: u32) -> c_int {
        let result = self.fs.create(path, mode).map(|_| 0);
        let rv = code(self.commit(result));
        info!("mknod({}, {:04o}) -> {}", path, mode, rv);
        rv
    }

    pub fn mkdir(&mut self, path: &str, mode: u32) -> c_int {
        let rv = self.mknod(path, mode | Mode::DIRECTORY.bits());
        info!("mkdir({}) -> {}", path, rv);
        rv
    }

    pub fn unlink(&mut self, path: &str) -> c_int {
        let result = self.fs.unlink(path).map(|_| 0);
        let rv = code(self.commit(result));
        info!("unlink({}) -> {}", path, rv);
        rv
    }

    /// `from` 是已有文件，`to` 是新名字
    pub fn link(&mut self, from: &str, to: &str) -> c_int {
        let result = self.fs.link(to, from).map(|_| 0);
        let rv = code(self.commit(result));
        info!("link({} => {}) -> {}", from, to, rv);
        rv
    }

    pub fn rmdir(&mut self, path: &str) -> c_int {
        let rv = -FileSystemError::Unsupported(format!("rmdir {}", path)).to_errno();
        info!("rmdir({}) -> {}", path, rv);
        rv
    }

    pub fn rename(&mut self, from: &str, to: &str) -> c_int {
        let result = self
            .fs
            .rename(from, to)
            .and_then(|_| self.fs.update_change_time(to))
            .map(|_| 0);
        let rv = code(self.commit(result));
        info!("rename({} => {}) -> {}", from, to, rv);
        rv
    }

    pub fn chmod(&mut self, path: &str, mode: u32) -> c_int {
        let result = self
            .fs
            .chmod(path, mode)
            .and_then(|_| self.fs.update_change_time(path))
            .map(|_| 0);
        let rv = code(self.commit(result));
        info!("chmod({}, {:04o}) -> {}", path, mode, rv);
        rv
    }

    pub fn truncate(&mut self, path: &str, size: i64) -> c_int {
        let result = offset_of(size)
            .and_then(|size| self.fs.truncate(path, size))
            .and_then(|_| self.fs.update_change_time(path))
            .map(|_| 0);
        let rv = code(self.commit(result));
        info!("truncate({}, {} bytes) -> {}", path, size, rv);
        rv
    }

    /// 不维护打开状态，只检查文件是否存在
    pub fn open(&mut self, path: &str) -> c_int {
        let rv = code(self.fs.resolve(path).map(|_| 0));
        info!("open({}) -> {}", path, rv);
        rv
    }

    pub fn read(&mut self, path: &str, buf: &mut [u8], offset: i64) -> c_int {
        let size = buf.len();
        let result = offset_of(offset)
            .and_then(|offset| self.fs.read(path, buf, offset))
            .and_then(byte_count);
        let rv = code(result);
        info!("read({}, {} bytes, @+{}) -> {}", path, size, offset, rv);
        rv
    }

    pub fn write(&mut self, path: &str, buf: &[u8], offset: i64) -> c_int {
        let result = offset_of(offset).and_then(|offset| self.fs.write(path, buf, offset));
        let rv = code(self.commit(result).and_then(byte_count));
        info!("write({}, {} bytes, @+{}) -> {}", path, buf.len(), offset, rv);
        rv
    }

    /// 时间以秒为单位：`[atime, mtime]`
    pub fn utimens(&mut self, path: &str, times: [i64; 2]) -> c_int {
        let result = self
            .fs
            .set_times(path, times[0], times[1])
            .and_then(|_| self.fs.update_change_time(path))
            .map(|_| 0);
        let rv = code(self.commit(result));
        info!("utimens({}, [{}, {}]) -> {}", path, times[0], times[1], rv);
        rv
    }

    pub fn ioctl(&mut self, path: &str, cmd: c_int) -> c_int {
        let rv = -FileSystemError::Unsupported(format!("ioctl {} on {}", cmd, path)).to_errno();
        info!("ioctl({}, {}, ...) -> {}", path, cmd, rv);
        rv
    }

    pub fn sync(&mut self) -> c_int {
        let rv = code(self.fs.sync().map(|_| 0));
        info!("sync() -> {}", rv);
        rv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    fn ops() -> Operations {
        Operations::new(FileSystem::mount(Box::new(MemDisk::new(64))).unwrap())
    }

    #[test]
    fn write_then_read_returns_byte_counts() {
        let mut ops = ops();
        assert_eq!(ops.mknod("/f", 0o100644), 0);
        assert_eq!(ops.open("/f"), 0);
        assert_eq!(ops.write("/f", b"hello", 0), 5);

        let mut buf = [0u8; 8];
        assert_eq!(ops.read("/f", &mut buf, 0), 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(ops.read("/f", &mut buf, -1), -libc::EINVAL);
    }

    #[test]
    fn errors_come_back_as_negative_errno() {
        let mut ops = ops();
        let mut st = Stat::default();
        assert_eq!(ops.getattr("/missing", &mut st), -libc::ENOENT);
        assert_eq!(ops.open("/missing"), -libc::ENOENT);
        assert_eq!(ops.mknod("/f", 0o100644), 0);
        assert_eq!(ops.mknod("/f", 0o100644), -libc::EEXIST);
        assert_eq!(ops.mknod("/f/x", 0o100644), -libc::ENOTDIR);
        assert_eq!(ops.access("/nope", 0), -libc::ENOENT);
    }

    #[test]
    fn rmdir_and_ioctl_are_unsupported() {
        let mut ops = ops();
        assert_eq!(ops.mkdir("/d", 0o755), 0);
        assert_eq!(ops.rmdir("/d"), -libc::ENOSYS);
        assert_eq!(ops.ioctl("/d", 1), -libc::ENOSYS);
    }

    #[test]
    fn mkdir_sets_directory_bit() {
        let mut ops = ops();
        assert_eq!(ops.mkdir("/d", 0o755), 0);
        let mut st = Stat::default();
        assert_eq!(ops.getattr("/d", &mut st), 0);
        assert_eq!(st.mode, 0o040755);
    }

    #[test]
    fn readdir_reports_dot_then_entries() {
        let mut ops = ops();
        ops.mkdir("/d", 0o755);
        ops.mknod("/d/a", 0o100644);
        ops.mknod("/d/b", 0o100600);

        let mut seen = Vec::new();
        assert_eq!(
            ops.readdir("/d/", |name, st| seen.push((name.to_string(), st.mode))),
            0
        );
        assert_eq!(
            seen,
            vec![
                (".".to_string(), 0o040755),
                ("a".to_string(), 0o100644),
                ("b".to_string(), 0o100600),
            ]
        );
    }

    #[test]
    fn byte_counts_beyond_c_int_overflow() {
        assert_eq!(byte_count(0).unwrap(), 0);
        assert_eq!(byte_count(c_int::MAX as usize).unwrap(), c_int::MAX);
        for n in [c_int::MAX as usize + 1, usize::MAX] {
            let err = byte_count(n).unwrap_err();
            assert!(matches!(err, FileSystemError::Overflow(_)));
            assert_eq!(-err.to_errno(), -libc::EOVERFLOW);
        }
    }

    #[test]
    fn link_to_directory_is_eperm() {
        let mut ops = ops();
        assert_eq!(ops.mkdir("/d", 0o755), 0);
        assert_eq!(ops.link("/d", "/d/self"), -libc::EPERM);
        assert_eq!(ops.link("/", "/root"), -libc::EPERM);

        let mut seen = Vec::new();
        ops.readdir("/d", |name, _| seen.push(name.to_string()));
        assert_eq!(seen, vec!["."]);
        assert_eq!(ops.rename("/d", "/e"), 0);
    }

    #[test]
    fn link_takes_existing_then_new_name() {
        let mut ops = ops();
        ops.mknod("/a", 0o100644);
        ops.write("/a", b"shared", 0);
        assert_eq!(ops.link("/a", "/b"), 0);
        assert_eq!(ops.unlink("/a"), 0);

        let mut buf = [0u8; 6];
        assert_eq!(ops.read("/b", &mut buf, 0), 6);
        assert_eq!(&buf, b"shared");
    }

    #[test]
    fn utimens_and_chmod_refresh_change_time() {
        let mut ops = ops();
        ops.mknod("/f", 0o100644);
        let mut st = Stat::default();
        ops.getattr("/f", &mut st);
        let before = st.ctime;

        assert_eq!(ops.utimens("/f", [10, 20]), 0);
        assert_eq!(ops.chmod("/f", 0o600), 0);
        ops.getattr("/f", &mut st);
        assert_eq!((st.atime, st.mtime), (10, 20));
        assert_eq!(st.mode, 0o100600);
        assert!(st.ctime >= before);
    }

    #[test]
    fn state_survives_remount() {
        let mut ops = ops();
        ops.mknod("/kept", 0o100644);
        ops.write("/kept", b"data", 0);

        let disk = ops.into_inner().unmount().unwrap();
        let fs = FileSystem::mount(disk).unwrap();
        assert_eq!(fs.stat("/kept").unwrap().size, 4);
    }
}
