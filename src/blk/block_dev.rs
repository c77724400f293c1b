//! 块设备仅支持以扇区为单位进行随机读写, 由具体的块设备来实现这几个方法.
//! 上层 (比如 [`crate::device::BlockFile`]) 只依赖这个 trait, 不关心请求是怎样被派发的.

use std::any::Any;

use crate::error::Result;

// 块设备接口层
// 定义设备需要实现的扇区读写接口 BlockDevice trait

pub trait BlockDevice: Send + Sync + Any {
    /// 从编号为 sector 的扇区开始读取 buf.len() 字节到 buf, buf 的长度必须是扇区大小的整数倍
    fn read_block(&self, sector: u64, buf: &mut [u8]) -> Result<()>;

    /// 将 buf 写入从编号为 sector 开始的扇区
    fn write_block(&self, sector: u64, buf: &[u8]) -> Result<()>;

    /// 设备容量, 以扇区计
    fn capacity_sectors(&self) -> u64;
}
