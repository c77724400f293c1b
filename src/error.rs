//! 块设备层的错误类型
//!
//! 所有错误都同步返回给提交者, 不做任何重试: 后备存储是本地内存, 重试不会改变结果.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlkError {
    /// 分配后备存储失败, 设备不会被注册
    #[error("out of memory allocating {requested} bytes of backing store")]
    OutOfMemory { requested: u64 },

    /// 某个段的 offset + len 超出了设备容量
    #[error("beyond-end access (offset {offset}, len {len}, capacity {capacity})")]
    OutOfRange { offset: u64, len: u64, capacity: u64 },

    /// 聚合结果: 请求中至少有一个段越界被跳过
    #[error("I/O error: {failed} segment(s) beyond end of device")]
    IoError { failed: usize },

    /// 长度或容量不是扇区大小的整数倍
    #[error("length {len} is not a multiple of the sector size")]
    Misaligned { len: u64 },

    /// 指定的主设备号已被占用
    #[error("major number {0} is busy")]
    Busy(u32),

    /// 动态主设备号已经分配完
    #[error("no free dynamic major number")]
    NoMajor,

    /// ioctl 命令不被支持 (-ENOTTY)
    #[error("inappropriate ioctl for device (cmd {0:#x})")]
    NotTty(u32),

    /// 派发队列已经关闭, 请求没有被处理
    #[error("dispatch queue is shut down")]
    QueueClosed,

    /// 硬件队列的工作线程没能启动
    #[error("failed to start hardware queue worker: {0}")]
    Worker(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = core::result::Result<T, BlkError>;

impl From<BlkError> for std::io::Error {
    fn from(err: BlkError) -> Self {
        let kind = match &err {
            BlkError::OutOfRange { .. } | BlkError::Misaligned { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            BlkError::OutOfMemory { .. } => std::io::ErrorKind::OutOfMemory,
            BlkError::NotTty(_) => std::io::ErrorKind::Unsupported,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
