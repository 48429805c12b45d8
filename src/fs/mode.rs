use bitflags::bitflags;

/// 权限位（rwxrwxrwx 加 setuid/setgid/sticky）
pub const PERMISSION_BITS: u32 = 0o7777;
/// 文件类型位
pub const TYPE_BITS: u32 = 0o170000;

bitflags! {
    /// inode 的类型与权限位，未知位原样保留
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mode: u32 {
        const DIRECTORY = 0o040000;
        const REGULAR = 0o100000;

        const _ = !0;
    }
}

impl Mode {
    pub fn is_dir(self) -> bool {
        self.bits() & TYPE_BITS == Self::DIRECTORY.bits()
    }

    pub fn permissions(self) -> u32 {
        self.bits() & PERMISSION_BITS
    }

    /// 只替换权限位，类型位保持不变
    pub fn with_permissions(self, requested: u32) -> Self {
        Self::from_bits_retain((self.bits() & !PERMISSION_BITS) | (requested & PERMISSION_BITS))
    }

    pub fn file(permissions: u32) -> Self {
        Self::REGULAR.with_permissions(permissions)
    }

    pub fn directory(permissions: u32) -> Self {
        Self::DIRECTORY.with_permissions(permissions)
    }
}
