//! 后备存储: 一块固定大小的内存, 代替真正的磁盘介质
//!
//! 它本身不负责请求之间的顺序, 内部的读写锁只保证内存安全;
//! 两个重叠的在途请求谁先谁后由上层保证.

use std::ops::Range;

use spin::RwLock;

use crate::error::{BlkError, Result};

pub struct BackingStore {
    data: RwLock<Vec<u8>>,
    capacity: u64,
}

impl BackingStore {
    /// 分配 capacity 字节并用 fill 填充. 分配失败返回 OutOfMemory, 不会 panic
    pub fn alloc(capacity: u64, fill: u8) -> Result<Self> {
        let oom = BlkError::OutOfMemory {
            requested: capacity,
        };
        let len = usize::try_from(capacity).map_err(|_| oom.clone())?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| oom)?;
        data.resize(len, 0);
        let store = Self {
            data: RwLock::new(data),
            capacity,
        };
        if fill != 0 {
            store.fill(fill);
        }
        Ok(store)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// 检查 [offset, offset + len) 是否在容量之内, 返回对应的下标区间
    fn range(&self, offset: u64, len: u64) -> Result<Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.capacity => Ok(offset as usize..end as usize),
            _ => Err(BlkError::OutOfRange {
                offset,
                len,
                capacity: self.capacity,
            }),
        }
    }

    pub fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let range = self.range(offset, len as u64)?;
        Ok(self.data.read()[range].to_vec())
    }

    /// 与 read 相同, 但直接拷贝到调用者的缓冲区
    pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.range(offset, buf.len() as u64)?;
        buf.copy_from_slice(&self.data.read()[range]);
        Ok(())
    }

    pub fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let range = self.range(offset, bytes.len() as u64)?;
        self.data.write()[range].copy_from_slice(bytes);
        Ok(())
    }

    /// 整块存储填充为同一个字节
    pub fn fill(&self, byte: u8) {
        self.data.write().iter_mut().for_each(|b| *b = byte);
    }
}
