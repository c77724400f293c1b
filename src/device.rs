use crate::blk::{BlockDevice, SECTOR_SIZE};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// 块设备的字节流视图, 相当于用户程序打开 /dev/simple_block 得到的文件.
///
/// 设备本身只能按扇区读写, 所以任意偏移的 read/write 要先换算成覆盖它的扇区区间;
/// 写入不满一个扇区时先把扇区读出来, 改掉其中一部分再整体写回.
/// 它借用设备, 因此设备在 BlockFile 存活期间不能被销毁.
pub struct BlockFile<'a, B: BlockDevice + ?Sized> {
    dev: &'a B,
    pos: u64,
}

impl<'a, B: BlockDevice + ?Sized> BlockFile<'a, B> {
    pub fn new(dev: &'a B) -> Self {
        Self { dev, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// 设备总字节数
    pub fn len(&self) -> u64 {
        self.dev.capacity_sectors() * SECTOR_SIZE as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从当前位置开始能访问的 (字节数, 起始扇区, 首扇区内偏移, 扇区数), 已到末尾时返回 None
    fn span(&self, want: usize) -> Option<(usize, u64, usize, usize)> {
        let len = self.len();
        if want == 0 || self.pos >= len {
            return None;
        }
        let n = (want as u64).min(len - self.pos) as usize;
        let sector = self.pos / SECTOR_SIZE as u64;
        let head = (self.pos % SECTOR_SIZE as u64) as usize;
        let nsect = (head + n + SECTOR_SIZE - 1) / SECTOR_SIZE;
        Some((n, sector, head, nsect))
    }
}

impl<B: BlockDevice + ?Sized> Read for BlockFile<'_, B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (n, sector, head, nsect) = match self.span(buf.len()) {
            Some(span) => span,
            None => return Ok(0),
        };
        let mut sectors = vec![0u8; nsect * SECTOR_SIZE];
        self.dev.read_block(sector, &mut sectors)?;
        buf[..n].copy_from_slice(&sectors[head..head + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl<B: BlockDevice + ?Sized> Write for BlockFile<'_, B> {
    /// 写到设备末尾之后返回 Ok(0), write_all 会把它变成 WriteZero
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (n, sector, head, nsect) = match self.span(buf.len()) {
            Some(span) => span,
            None => return Ok(0),
        };
        let mut sectors = vec![0u8; nsect * SECTOR_SIZE];
        if head != 0 || n % SECTOR_SIZE != 0 {
            // read-modify-write
            self.dev.read_block(sector, &mut sectors)?;
        }
        sectors[head..head + n].copy_from_slice(&buf[..n]);
        self.dev.write_block(sector, &sectors)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<B: BlockDevice + ?Sized> Seek for BlockFile<'_, B> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(d) => self.len().checked_add_signed(d),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
        };
        match target {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
