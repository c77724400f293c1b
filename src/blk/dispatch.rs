//! 派发队列
//!
//! 请求有两条路径到达 [`handle_request`]:
//! - [`DispatchQueue::submit`]: 在调用者线程上直接处理, 同步返回结果;
//! - [`DispatchQueue::enqueue`]: 放进某个硬件队列, 由该队列的工作线程处理, 通过 [`Ticket`] 取回结果.
//!
//! 无论哪条路径, 一个请求都由同一个线程从头处理到尾, 中途不会暂停.
//! 不同请求之间可以并发, 重叠区间的先后顺序由上层保证.

use core::fmt;
use core::str::FromStr;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};

use super::{transfer, Disk, Request, SECTOR_SIZE};
use crate::error::{BlkError, Result};

/// 遇到越界段时怎么办
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangePolicy {
    /// 在第一个越界段处停下, 前面已完成的段保持生效, 返回 OutOfRange
    #[default]
    Abort,
    /// 跳过越界段继续处理后面的段, 最后返回一次 IoError
    Skip,
}

impl FromStr for RangePolicy {
    type Err = BlkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort" => Ok(RangePolicy::Abort),
            "skip" => Ok(RangePolicy::Skip),
            _ => Err(BlkError::InvalidConfig("range policy must be `abort` or `skip`")),
        }
    }
}

impl fmt::Display for RangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangePolicy::Abort => f.write_str("abort"),
            RangePolicy::Skip => f.write_str("skip"),
        }
    }
}

/// 处理一个请求: 按顺序把每一段交给 [`transfer`], 扇区号随段长累加.
///
/// 段长不是扇区整数倍的请求, 以及起始扇区不在设备内的请求 (包括空请求和容量为 0 的设备),
/// 在任何传输之前就被拒绝, 与越界策略无关.
pub fn handle_request(disk: &Disk, req: &mut Request) -> Result<()> {
    if let Some(seg) = req.segments.iter().find(|seg| !seg.is_aligned()) {
        warn!("{}: unaligned segment of {} bytes", disk.name(), seg.len());
        return Err(BlkError::Misaligned {
            len: seg.len() as u64,
        });
    }

    if req.sector >= disk.capacity_sectors() {
        warn!(
            "{}: request starts beyond end (sector {}, capacity {} sectors)",
            disk.name(),
            req.sector,
            disk.capacity_sectors()
        );
        disk.account_range_error();
        return Err(BlkError::OutOfRange {
            offset: req.sector.saturating_mul(SECTOR_SIZE as u64),
            len: req.size(),
            capacity: disk.capacity_bytes(),
        });
    }

    let direction = req.direction;
    info!(
        "{}: request - sector: {}, size: {}, dir: {}",
        disk.name(),
        req.sector,
        req.size(),
        direction
    );

    let mut failed = 0;
    for (sector, segment) in req.iter_segments() {
        debug!(
            "{}: processing segment - sector: {}, len: {}",
            disk.name(),
            sector,
            segment.len()
        );
        let nsect = segment.sectors();
        match transfer(disk.store(), sector, nsect, segment.as_bytes_mut(), direction) {
            Ok(()) => disk.account(direction, segment.len() as u64),
            Err(err) => {
                disk.account_range_error();
                match disk.policy() {
                    RangePolicy::Abort => return Err(err),
                    RangePolicy::Skip => failed += 1,
                }
            }
        }
    }

    if failed > 0 {
        Err(BlkError::IoError { failed })
    } else {
        Ok(())
    }
}

/// 请求处理完后交还给提交者
#[derive(Debug)]
pub struct Completion {
    pub request: Request,
    pub result: Result<()>,
}

/// 异步提交的凭据
pub struct Ticket {
    rx: Receiver<Completion>,
}

impl Ticket {
    /// 阻塞直到请求完成
    pub fn wait(self) -> Result<Completion> {
        self.rx.recv().map_err(|_| BlkError::QueueClosed)
    }
}

struct Job {
    request: Request,
    done: mpsc::Sender<Completion>,
}

/// 硬件队列: 每个队列一个有界通道加一个工作线程
pub struct DispatchQueue {
    disk: Arc<Disk>,
    queues: Vec<SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
    next: AtomicUsize,
}

impl DispatchQueue {
    pub fn start(disk: Arc<Disk>, nr_hw_queues: usize, queue_depth: usize) -> Result<Self> {
        let mut queue = Self {
            disk,
            queues: Vec::with_capacity(nr_hw_queues),
            workers: Vec::with_capacity(nr_hw_queues),
            next: AtomicUsize::new(0),
        };
        for hctx in 0..nr_hw_queues {
            let (tx, rx) = mpsc::sync_channel::<Job>(queue_depth);
            let disk = Arc::clone(&queue.disk);
            let worker = thread::Builder::new()
                .name(format!("{}-hctx{}", disk.name(), hctx))
                .spawn(move || run_hw_queue(disk, rx))
                // 已经启动的线程会在 queue 被 drop 时回收
                .map_err(|err| BlkError::Worker(err.to_string()))?;
            queue.queues.push(tx);
            queue.workers.push(worker);
        }
        debug!(
            "{}: started {} hardware queue(s), depth {}",
            queue.disk.name(),
            nr_hw_queues,
            queue_depth
        );
        Ok(queue)
    }

    pub fn nr_hw_queues(&self) -> usize {
        self.workers.len()
    }

    /// 在当前线程上直接处理
    pub fn submit(&self, req: &mut Request) -> Result<()> {
        handle_request(&self.disk, req)
    }

    /// 轮转选择一个硬件队列放入请求. 队列满时阻塞, 直到有空位
    pub fn enqueue(&self, request: Request) -> Result<Ticket> {
        if self.queues.is_empty() {
            return Err(BlkError::QueueClosed);
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.queues.len();
        let (done, rx) = mpsc::channel();
        self.queues[idx]
            .send(Job { request, done })
            .map_err(|_| BlkError::QueueClosed)?;
        Ok(Ticket { rx })
    }

    /// 关闭所有队列: 已经排队的请求会被处理完, 然后回收工作线程
    pub fn shutdown(&mut self) {
        self.queues.clear();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("{}: hardware queue worker panicked", self.disk.name());
            }
        }
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_hw_queue(disk: Arc<Disk>, rx: Receiver<Job>) {
    for Job { mut request, done } in rx {
        let result = handle_request(&disk, &mut request);
        // 提交者可能已经丢弃了 Ticket
        let _ = done.send(Completion { request, result });
    }
}
