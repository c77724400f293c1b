mod block_dev;
mod disk;
mod dispatch;
mod lifecycle;
mod registry;
mod request;
mod store;
mod transfer;

extern crate log;

/// Use a sector size of 512 bytes
pub const SECTOR_SIZE: usize = 512;
/// 默认的磁盘名, 对应 /dev/simple_block
pub const DISK_NAME: &str = "simple_block";
/// 默认容量 1MB, 即 2048 个扇区
pub const DEFAULT_CAPACITY: u64 = 1024 * 1024;
/// 每个磁盘预留的次设备号数量
pub const SIMPLE_BLOCK_MINORS: u32 = 16;
/// 默认硬件队列数
pub const DEFAULT_NR_HW_QUEUES: usize = 1;
/// 每个硬件队列最多同时挂起的请求数 (tag set 的 queue_depth)
pub const DEFAULT_QUEUE_DEPTH: usize = 128;
/// 队列深度上限, 同 BLK_MQ_MAX_DEPTH
pub const BLK_MQ_MAX_DEPTH: usize = 10240;
/// 硬件队列数上限
pub const MAX_NR_HW_QUEUES: usize = 64;

pub use block_dev::BlockDevice;
pub use disk::{DeviceStats, Disk, BLKGETSIZE, BLKGETSIZE64, BLKSSZGET};
pub use dispatch::{handle_request, Completion, DispatchQueue, RangePolicy, Ticket};
pub use lifecycle::{create_device, destroy_device, device_capacity_sectors, submit, DeviceHandle};
pub use registry::{
    dev_path, register_blkdev, registered_major, registered_name, unregister_blkdev,
};
pub use request::{Direction, Request, Segment, SegmentIter};
pub use store::BackingStore;
pub use transfer::transfer;
