//! simple-blk: 一个运行在进程内的内存块设备
//!
//! 请求的处理流程: [`blk::DeviceHandle`] 把请求交给派发队列,
//! 派发队列逐段遍历请求, 每一段通过 [`blk::transfer`] 与后备存储交换数据.

pub mod blk;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;

#[cfg(test)]
mod test;

pub use blk::{
    create_device, destroy_device, device_capacity_sectors, submit, BlockDevice, DeviceHandle,
    Direction, Request, Segment, SECTOR_SIZE,
};
pub use config::Config;
pub use device::BlockFile;
pub use error::{BlkError, Result};
