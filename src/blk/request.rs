//! 请求与段
//!
//! 一个 [`Request`] 描述一次 I/O: 方向, 起始扇区, 以及若干个按顺序排列的内存段 [`Segment`].
//! 各段在设备上是连续的, 第 i 段的起始扇区 = 起始扇区 + 前 i 段的扇区数之和,
//! 这个累加由 [`SegmentIter`] 完成.

use core::fmt;
use core::slice;

use super::SECTOR_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Read => "READ",
            Direction::Write => "WRITE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一段连续的内存. 写请求从这里取数据, 读请求把数据放到这里
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    buf: Vec<u8>,
}

impl Segment {
    pub fn new(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    /// 长度为 len 的全零段, 一般用作读请求的目的缓冲区
    pub fn zeroed(len: usize) -> Self {
        Self { buf: vec![0; len] }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self { buf: data.to_vec() }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// 段覆盖的扇区数
    pub fn sectors(&self) -> u64 {
        (self.buf.len() / SECTOR_SIZE) as u64
    }

    pub fn is_aligned(&self) -> bool {
        self.buf.len() % SECTOR_SIZE == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl From<Vec<u8>> for Segment {
    fn from(buf: Vec<u8>) -> Self {
        Self::new(buf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub direction: Direction,
    /// 起始扇区
    pub sector: u64,
    pub segments: Vec<Segment>,
}

impl Request {
    pub fn new(direction: Direction, sector: u64, segments: Vec<Segment>) -> Self {
        Self {
            direction,
            sector,
            segments,
        }
    }

    pub fn read(sector: u64, segments: Vec<Segment>) -> Self {
        Self::new(Direction::Read, sector, segments)
    }

    pub fn write(sector: u64, segments: Vec<Segment>) -> Self {
        Self::new(Direction::Write, sector, segments)
    }

    /// 请求的总字节数
    pub fn size(&self) -> u64 {
        self.segments.iter().map(|seg| seg.len() as u64).sum()
    }

    /// 按提交顺序遍历各段, 同时给出每段的绝对起始扇区
    pub fn iter_segments(&mut self) -> SegmentIter<'_> {
        SegmentIter {
            inner: self.segments.iter_mut(),
            sector: self.sector,
        }
    }

    /// 把所有段的数据按顺序拼接起来
    pub fn data(&self) -> Vec<u8> {
        self.segments
            .iter()
            .flat_map(|seg| seg.as_bytes().iter().copied())
            .collect()
    }
}

pub struct SegmentIter<'a> {
    inner: slice::IterMut<'a, Segment>,
    /// 下一段的起始扇区
    sector: u64,
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = (u64, &'a mut Segment);

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.inner.next()?;
        let sector = self.sector;
        self.sector = self.sector.saturating_add(segment.sectors());
        Some((sector, segment))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
