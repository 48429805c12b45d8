/// 通用分配位图，数据块和 inode 各用一个实例
///
/// 某一位为 1 表示对应编号已被占用；分配总是选取编号最小的空闲位。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bits: Vec<u8>, // 位图数据，每个 bit 表示一个编号是否被使用
    total: u32,    // 编号总数
    free: u32,     // 当前空闲数
}

impl Bitmap {
    // 创建一个新的位图（所有位清零 = 空闲）
    pub fn new(total: u32) -> Self {
        Self {
            bits: vec![0; Self::byte_len(total)],
            total,
            free: total,
        }
    }

    /// 从磁盘上读出的字节恢复位图，多余的字节被丢弃
    pub fn from_bytes(bytes: &[u8], total: u32) -> Self {
        let mut bits = bytes[..Self::byte_len(total).min(bytes.len())].to_vec();
        bits.resize(Self::byte_len(total), 0);

        // 最后一个字节里超出 total 的位不计入
        let tail = total % 8;
        if tail != 0 {
            if let Some(last) = bits.last_mut() {
                *last &= (1u8 << tail) - 1;
            }
        }

        let used: u32 = bits.iter().map(|b| b.count_ones()).sum();
        Self {
            bits,
            total,
            free: total - used,
        }
    }

    pub fn byte_len(total: u32) -> usize {
        (total as usize + 7) / 8
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn free_count(&self) -> u32 {
        self.free
    }

    // 分配一个空闲编号（首次适配）
    pub fn alloc(&mut self) -> Option<u32> {
        for (byte_index, byte) in self.bits.iter_mut().enumerate() {
            if *byte == 0xFF {
                continue;
            }
            for bit in 0..8 {
                let index = (byte_index * 8 + bit) as u32;
                if index >= self.total {
                    return None;
                }
                if *byte & (1 << bit) == 0 {
                    *byte |= 1 << bit;
                    self.free -= 1;
                    return Some(index);
                }
            }
        }
        None
    }

    /// 直接标记为已占用（用于保留区）
    pub fn set_used(&mut self, index: u32) {
        if index >= self.total {
            return;
        }
        let (byte_index, mask) = Self::locate(index);
        if self.bits[byte_index] & mask == 0 {
            self.bits[byte_index] |= mask;
            self.free -= 1;
        }
    }

    // 释放一个编号，重复释放无效果
    pub fn free(&mut self, index: u32) {
        if index >= self.total {
            return; // 防止越界
        }
        let (byte_index, mask) = Self::locate(index);
        if self.bits[byte_index] & mask != 0 {
            self.bits[byte_index] &= !mask;
            self.free += 1;
        }
    }

    pub fn is_used(&self, index: u32) -> bool {
        if index >= self.total {
            return false;
        }
        let (byte_index, mask) = Self::locate(index);
        self.bits[byte_index] & mask != 0
    }

    fn locate(index: u32) -> (usize, u8) {
        ((index / 8) as usize, 1 << (index % 8))
    }
}
