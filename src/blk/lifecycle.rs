//! 设备的创建与销毁
//!
//! 创建顺序: 分配后备存储 -> 登记主设备号 -> 启动派发队列.
//! 任何一步失败都会撤销之前的步骤, 不会留下登记了却不可用的设备.
//! 销毁时顺序相反, 由 [`DeviceHandle`] 的 Drop 完成, 所以句柄被消费之后就不可能再提交请求.

use std::sync::Arc;

use log::info;

use super::{
    dev_path, register_blkdev, unregister_blkdev, BackingStore, BlockDevice, DeviceStats,
    Direction, Disk, DispatchQueue, Request, Segment, Ticket, SECTOR_SIZE,
};
use crate::config::Config;
use crate::error::{BlkError, Result};

pub struct DeviceHandle {
    // 先于 disk 释放: 工作线程退出后才放掉存储
    queue: DispatchQueue,
    disk: Arc<Disk>,
}

impl DeviceHandle {
    pub fn create(config: &Config) -> Result<Self> {
        config.validate()?;
        if config.capacity % SECTOR_SIZE as u64 != 0 {
            return Err(BlkError::Misaligned {
                len: config.capacity,
            });
        }

        let store = BackingStore::alloc(config.capacity, config.fill)?;
        info!(
            "{}: allocated {} bytes of storage",
            config.name, config.capacity
        );

        let major = register_blkdev(0, &config.name)?;
        let disk = Arc::new(Disk::new(&config.name, major, store, config.policy));
        info!(
            "{}: registered with major number {} ({} minors)",
            disk.name(),
            major,
            disk.minors()
        );
        let queue =
            match DispatchQueue::start(Arc::clone(&disk), config.nr_hw_queues, config.queue_depth)
            {
                Ok(queue) => queue,
                Err(err) => {
                    unregister_blkdev(major, &config.name);
                    return Err(err);
                }
            };

        info!(
            "{}: device size: {} bytes ({} sectors)",
            disk.name(),
            disk.capacity_bytes(),
            disk.capacity_sectors()
        );
        info!("{}: device {} created successfully", disk.name(), dev_path(disk.name()));
        Ok(Self { queue, disk })
    }

    /// 停止队列, 注销设备, 释放存储
    pub fn destroy(self) {
        drop(self);
    }

    pub fn name(&self) -> &str {
        self.disk.name()
    }

    pub fn major(&self) -> u32 {
        self.disk.major()
    }

    pub fn dev_path(&self) -> String {
        dev_path(self.disk.name())
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.disk.capacity_bytes()
    }

    pub fn capacity_sectors(&self) -> u64 {
        self.disk.capacity_sectors()
    }

    pub fn submit(&self, req: &mut Request) -> Result<()> {
        self.queue.submit(req)
    }

    pub fn enqueue(&self, req: Request) -> Result<Ticket> {
        self.queue.enqueue(req)
    }

    pub fn open(&self) {
        self.disk.open()
    }

    pub fn release(&self) {
        self.disk.release()
    }

    pub fn ioctl(&self, cmd: u32) -> Result<u64> {
        self.disk.ioctl(cmd)
    }

    pub fn stats(&self) -> DeviceStats {
        self.disk.stats()
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.queue.shutdown();
        unregister_blkdev(self.disk.major(), self.disk.name());
        info!("{}: device unloaded", self.disk.name());
    }
}

impl BlockDevice for DeviceHandle {
    fn read_block(&self, sector: u64, buf: &mut [u8]) -> Result<()> {
        let mut req = Request::read(sector, vec![Segment::zeroed(buf.len())]);
        self.submit(&mut req)?;
        buf.copy_from_slice(req.segments[0].as_bytes());
        Ok(())
    }

    fn write_block(&self, sector: u64, buf: &[u8]) -> Result<()> {
        self.submit(&mut Request::write(sector, vec![Segment::from_slice(buf)]))
    }

    fn capacity_sectors(&self) -> u64 {
        self.disk.capacity_sectors()
    }
}

/// 用默认配置创建一个容量为 capacity_bytes 的设备
pub fn create_device(capacity_bytes: u64) -> Result<DeviceHandle> {
    DeviceHandle::create(&Config {
        capacity: capacity_bytes,
        ..Config::default()
    })
}

pub fn destroy_device(handle: DeviceHandle) {
    handle.destroy()
}

/// 同步提交一次 I/O. 读请求完成后数据留在 segments 中
pub fn submit(
    handle: &DeviceHandle,
    direction: Direction,
    starting_sector: u64,
    segments: &mut Vec<Segment>,
) -> Result<()> {
    let mut req = Request::new(direction, starting_sector, core::mem::take(segments));
    let result = handle.submit(&mut req);
    *segments = req.segments;
    result
}

pub fn device_capacity_sectors(handle: &DeviceHandle) -> u64 {
    handle.capacity_sectors()
}
