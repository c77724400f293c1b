//! 单段传输: 在后备存储和调用者缓冲区之间拷贝一段连续的扇区

use log::{trace, warn};

use super::{BackingStore, Direction, SECTOR_SIZE};
use crate::error::{BlkError, Result};

/// 从 sector 开始传输 nsect 个扇区. buf 至少要有 nsect * SECTOR_SIZE 字节.
///
/// 越界时只打印一条 notice 并返回 OutOfRange, 存储和 buf 都不会被改动;
/// 是否继续处理后面的段由调用者决定.
pub fn transfer(
    store: &BackingStore,
    sector: u64,
    nsect: u64,
    buf: &mut [u8],
    direction: Direction,
) -> Result<()> {
    let capacity = store.capacity();
    let (offset, nbytes) = match (
        sector.checked_mul(SECTOR_SIZE as u64),
        nsect.checked_mul(SECTOR_SIZE as u64),
    ) {
        (Some(offset), Some(nbytes)) => (offset, nbytes),
        _ => {
            warn!("beyond-end {} (sector {} nsect {})", direction, sector, nsect);
            return Err(BlkError::OutOfRange {
                offset: sector.saturating_mul(SECTOR_SIZE as u64),
                len: nsect.saturating_mul(SECTOR_SIZE as u64),
                capacity,
            });
        }
    };

    if offset.checked_add(nbytes).map_or(true, |end| end > capacity) {
        warn!("beyond-end {} ({} {})", direction, offset, nbytes);
        return Err(BlkError::OutOfRange {
            offset,
            len: nbytes,
            capacity,
        });
    }

    let buf_len = buf.len() as u64;
    let buf = buf
        .get_mut(..nbytes as usize)
        .ok_or(BlkError::Misaligned { len: buf_len })?;
    match direction {
        Direction::Write => {
            store.write(offset, buf)?;
            trace!("wrote {} bytes at offset {}", nbytes, offset);
        }
        Direction::Read => {
            store.read_into(offset, buf)?;
            trace!("read {} bytes at offset {}", nbytes, offset);
        }
    }
    Ok(())
}
