//! 磁盘对象: 名字, 主设备号, 后备存储, 越界策略, 以及统计信息
//!
//! 对应内核中 gendisk + 驱动私有数据的组合. open/release/ioctl 是块设备操作表里的三个钩子.

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use log::info;

use super::{BackingStore, Direction, RangePolicy, SECTOR_SIZE, SIMPLE_BLOCK_MINORS};
use crate::error::{BlkError, Result};

/// 以扇区为单位返回设备大小
pub const BLKGETSIZE: u32 = 0x1260;
/// 返回逻辑扇区大小
pub const BLKSSZGET: u32 = 0x1268;
/// 以字节为单位返回设备大小
pub const BLKGETSIZE64: u32 = 0x8008_1272;

/// 某一时刻的统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub reads: u64,
    pub writes: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// 越界段的数量
    pub range_errors: u64,
    /// 当前打开者数量
    pub users: usize,
}

#[derive(Default)]
struct Counters {
    reads: AtomicU64,
    writes: AtomicU64,
    read_bytes: AtomicU64,
    write_bytes: AtomicU64,
    range_errors: AtomicU64,
}

pub struct Disk {
    name: String,
    major: u32,
    minors: u32,
    policy: RangePolicy,
    store: BackingStore,
    counters: Counters,
    users: AtomicUsize,
}

impl Disk {
    pub fn new(name: &str, major: u32, store: BackingStore, policy: RangePolicy) -> Self {
        Self {
            name: name.to_string(),
            major,
            minors: SIMPLE_BLOCK_MINORS,
            policy,
            store,
            counters: Counters::default(),
            users: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minors(&self) -> u32 {
        self.minors
    }

    pub fn policy(&self) -> RangePolicy {
        self.policy
    }

    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.store.capacity()
    }

    pub fn capacity_sectors(&self) -> u64 {
        self.store.capacity() / SECTOR_SIZE as u64
    }

    /// 记录一段成功的传输
    pub(super) fn account(&self, direction: Direction, bytes: u64) {
        let (ops, total) = match direction {
            Direction::Read => (&self.counters.reads, &self.counters.read_bytes),
            Direction::Write => (&self.counters.writes, &self.counters.write_bytes),
        };
        ops.fetch_add(1, Ordering::Relaxed);
        total.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(super) fn account_range_error(&self) {
        self.counters.range_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            reads: self.counters.reads.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            read_bytes: self.counters.read_bytes.load(Ordering::Relaxed),
            write_bytes: self.counters.write_bytes.load(Ordering::Relaxed),
            range_errors: self.counters.range_errors.load(Ordering::Relaxed),
            users: self.users.load(Ordering::Relaxed),
        }
    }

    pub fn open(&self) {
        self.users.fetch_add(1, Ordering::AcqRel);
        info!("{}: device opened", self.name);
    }

    pub fn release(&self) {
        // 多余的 release 不让计数下溢
        let _ = self
            .users
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        info!("{}: device released", self.name);
    }

    pub fn ioctl(&self, cmd: u32) -> Result<u64> {
        info!("{}: ioctl called with cmd: {:#x}", self.name, cmd);
        match cmd {
            BLKGETSIZE => Ok(self.capacity_sectors()),
            BLKGETSIZE64 => Ok(self.capacity_bytes()),
            BLKSSZGET => Ok(SECTOR_SIZE as u64),
            _ => Err(BlkError::NotTty(cmd)),
        }
    }
}
