/// 块大小：4KB，磁盘读写、分配和链表都以块为单位
pub const BLOCK_SIZE: usize = 4096;

/// 新建镜像时默认的块数：256 块 = 1MB
pub const DEFAULT_BLOCK_COUNT: u64 = 256;

/// 一个块的原始内容
pub type Block = [u8; BLOCK_SIZE];
