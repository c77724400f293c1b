use std::io::{self, Read, Seek, SeekFrom, Write};

use simple_blk::blk::{BLKGETSIZE64, DEFAULT_CAPACITY};
use simple_blk::config::{self, Config};
use simple_blk::{logging, BlockFile, DeviceHandle, Request, Segment, SECTOR_SIZE};

const TEST_DATA: &str = "This is test data for our simple block device!";

fn main() {
    let matches = config::command().get_matches();
    logging::init(config::log_level(&matches));

    if let Err(err) = simple_blk_test(&matches) {
        eprintln!("simple-blk: {}", err);
        std::process::exit(1);
    }
}

// 创建一个内存块设备, 然后像用户程序操作 /dev/simple_block 一样读写它
fn simple_blk_test(matches: &clap::ArgMatches) -> io::Result<()> {
    let config = Config::from_matches(matches)?;
    if config.capacity < DEFAULT_CAPACITY {
        log::warn!(
            "capacity {} is smaller than the default, some steps will hit the end of the device",
            config.capacity
        );
    }
    let handle = DeviceHandle::create(&config)?;

    println!("=== Block Device Test ===");
    println!("Opening block device {}...", handle.dev_path());
    handle.open();

    let size = handle.ioctl(BLKGETSIZE64)?;
    println!(
        "Device size: {} bytes ({} sectors)",
        size,
        size / SECTOR_SIZE as u64
    );

    let mut file = BlockFile::new(&handle);

    // 第 0 个扇区: 写入后读回校验
    println!("\nTesting block I/O operations:");
    let mut write_buf = [0u8; SECTOR_SIZE];
    write_buf[..TEST_DATA.len()].copy_from_slice(TEST_DATA.as_bytes());
    println!("Writing to sector 0...");
    file.write_all(&write_buf)?;
    println!("Wrote {} bytes to block device", write_buf.len());

    file.seek(SeekFrom::Start(0))?;
    let mut read_buf = [0u8; SECTOR_SIZE];
    println!("Reading from sector 0...");
    file.read_exact(&mut read_buf)?;
    println!("Read {} bytes from block device", read_buf.len());
    println!("Data: {}", c_str(&read_buf));
    if read_buf[..TEST_DATA.len()] == write_buf[..TEST_DATA.len()] {
        println!("Data verification successful");
    } else {
        println!("Data verification failed");
    }

    // 1..4 号扇区各写一条
    println!("\nTesting multiple sector writes...");
    for i in 1..5u64 {
        let mut buf = [0u8; SECTOR_SIZE];
        let text = format!("Sector {} data", i);
        buf[..text.len()].copy_from_slice(text.as_bytes());
        file.seek(SeekFrom::Start(i * SECTOR_SIZE as u64))?;
        if file.write(&buf)? > 0 {
            println!("Wrote to sector {}: {}", i, text);
        }
    }

    println!("\nReading back multiple sectors...");
    for i in 1..5u64 {
        let mut buf = [0u8; SECTOR_SIZE];
        file.seek(SeekFrom::Start(i * SECTOR_SIZE as u64))?;
        if file.read(&mut buf)? > 0 {
            println!("Read from sector {}: {}", i, c_str(&buf));
        }
    }

    // 4KB 的大请求, 拆成 8 个段一次提交
    println!("\nTesting large I/O (4KB write)...");
    let mut large = vec![0x55u8; 4096];
    let text = b"Large I/O test - 4KB of data";
    large[..text.len()].copy_from_slice(text);
    let segments = large.chunks(SECTOR_SIZE).map(Segment::from_slice).collect();
    match handle.submit(&mut Request::write(10, segments)) {
        Ok(()) => println!("Large write successful: {} bytes", large.len()),
        Err(err) => println!("Large write failed: {}", err),
    }

    // 越过设备末尾的请求
    println!("\nTesting beyond-end request...");
    let last = handle.capacity_sectors().saturating_sub(1);
    let mut req = Request::write(last, vec![Segment::zeroed(2 * SECTOR_SIZE)]);
    match handle.submit(&mut req) {
        Ok(()) => println!("Beyond-end request unexpectedly succeeded"),
        Err(err) => println!("Beyond-end request rejected: {}", err),
    }

    let stats = handle.stats();
    println!(
        "\nStats: {} reads ({} bytes), {} writes ({} bytes), {} range errors",
        stats.reads, stats.read_bytes, stats.writes, stats.write_bytes, stats.range_errors
    );

    drop(file);
    handle.release();
    handle.destroy();
    println!("\nBlock device test completed successfully");
    Ok(())
}

/// 把缓冲区当作 C 字符串显示到第一个 0 为止
fn c_str(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
