//! 主设备号登记表
//!
//! 与 register_blkdev 一样: 传入 major = 0 时动态分配, 从 254 开始向下找第一个空闲的号;
//! 传入非零 major 时该号必须空闲.
//! 登记表是全局的, 这里只记录 "哪个名字占用了哪个号", 设备本身由 [`super::DeviceHandle`] 持有.

use lazy_static::*;
use log::debug;
use spin::Mutex;

use crate::error::{BlkError, Result};

/// 可用的最大主设备号
const MAX_MAJOR: u32 = 254;

pub struct BlkdevRegistry {
    /// (major, name)
    majors: Vec<(u32, String)>,
}

impl BlkdevRegistry {
    pub fn new() -> Self {
        Self { majors: Vec::new() }
    }

    fn is_used(&self, major: u32) -> bool {
        self.majors.iter().any(|(m, _)| *m == major)
    }

    pub fn register(&mut self, major: u32, name: &str) -> Result<u32> {
        let major = if major == 0 {
            (1..=MAX_MAJOR)
                .rev()
                .find(|m| !self.is_used(*m))
                .ok_or(BlkError::NoMajor)?
        } else if major > MAX_MAJOR || self.is_used(major) {
            return Err(BlkError::Busy(major));
        } else {
            major
        };
        self.majors.push((major, name.to_string()));
        debug!("registered {} with major {}", name, major);
        Ok(major)
    }

    /// 只有 major 和 name 都对得上才会删除
    pub fn unregister(&mut self, major: u32, name: &str) -> bool {
        match self
            .majors
            .iter()
            .position(|(m, n)| *m == major && n == name)
        {
            Some(idx) => {
                self.majors.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn major_of(&self, name: &str) -> Option<u32> {
        self.majors
            .iter()
            .find(|(_, n)| n == name)
            .map(|(m, _)| *m)
    }

    pub fn name_of(&self, major: u32) -> Option<String> {
        self.majors
            .iter()
            .find(|(m, _)| *m == major)
            .map(|(_, n)| n.clone())
    }
}

impl Default for BlkdevRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref BLKDEV_REGISTRY: Mutex<BlkdevRegistry> = Mutex::new(BlkdevRegistry::new());
}

pub fn register_blkdev(major: u32, name: &str) -> Result<u32> {
    BLKDEV_REGISTRY.lock().register(major, name)
}

pub fn unregister_blkdev(major: u32, name: &str) -> bool {
    BLKDEV_REGISTRY.lock().unregister(major, name)
}

pub fn registered_name(major: u32) -> Option<String> {
    BLKDEV_REGISTRY.lock().name_of(major)
}

pub fn registered_major(name: &str) -> Option<u32> {
    BLKDEV_REGISTRY.lock().major_of(name)
}

/// 设备在用户空间的路径
pub fn dev_path(name: &str) -> String {
    format!("/dev/{}", name)
}
