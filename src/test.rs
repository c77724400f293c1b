#![allow(unused)]
use super::blk;
use crate::config::Config;
use crate::error::BlkError;
use blk::{
    create_device, destroy_device, device_capacity_sectors, submit, DeviceHandle, Direction,
    RangePolicy, Request, Segment, SECTOR_SIZE,
};
use std::sync::Arc;
use std::thread;

fn device(name: &str, capacity: u64, policy: RangePolicy) -> DeviceHandle {
    DeviceHandle::create(&Config {
        name: name.to_string(),
        capacity,
        policy,
        ..Config::default()
    })
    .unwrap()
}

fn read_sectors(handle: &DeviceHandle, sector: u64, nsect: usize) -> Vec<u8> {
    let mut segments = vec![Segment::zeroed(nsect * SECTOR_SIZE)];
    submit(handle, Direction::Read, sector, &mut segments).unwrap();
    segments.remove(0).into_inner()
}

fn random_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|_| rand::random::<u8>()).collect()
}

#[test]
fn write_abc_then_read_sector_zero() {
    let handle = create_device(1_048_576).unwrap();
    assert_eq!(device_capacity_sectors(&handle), 2048);

    let mut sector = vec![0u8; SECTOR_SIZE];
    sector[..3].copy_from_slice(b"ABC");
    let mut segments = vec![Segment::new(sector)];
    submit(&handle, Direction::Write, 0, &mut segments).unwrap();

    let data = read_sectors(&handle, 0, 1);
    assert_eq!(&data[..3], b"ABC");
    assert!(data[3..].iter().all(|b| *b == 0));
    destroy_device(handle);
}

#[test]
fn request_spanning_the_last_sector_is_out_of_range() {
    let handle = create_device(1_048_576).unwrap();
    let mut segments = vec![Segment::new(vec![0x5A; 1024])];
    let err = submit(&handle, Direction::Write, 2047, &mut segments).unwrap_err();
    assert_eq!(
        err,
        BlkError::OutOfRange {
            offset: 2047 * 512,
            len: 1024,
            capacity: 1_048_576
        }
    );
    // 最后一个扇区没有被写
    assert_eq!(read_sectors(&handle, 2047, 1), vec![0u8; SECTOR_SIZE]);
}

#[test]
fn two_segments_land_on_consecutive_sectors() {
    let handle = create_device(1_048_576).unwrap();
    let first = vec![0x11u8; SECTOR_SIZE];
    let second = vec![0x22u8; SECTOR_SIZE];
    let mut segments = vec![Segment::new(first.clone()), Segment::new(second.clone())];
    submit(&handle, Direction::Write, 10, &mut segments).unwrap();

    assert_eq!(read_sectors(&handle, 10, 1), first);
    assert_eq!(read_sectors(&handle, 11, 1), second);
}

#[test]
fn zero_capacity_device() {
    let handle = create_device(0).unwrap();
    assert_eq!(handle.capacity_sectors(), 0);
    let mut segments = vec![Segment::zeroed(SECTOR_SIZE)];
    assert!(matches!(
        submit(&handle, Direction::Read, 0, &mut segments),
        Err(BlkError::OutOfRange { .. })
    ));

    let skip = device("zero_skip", 0, RangePolicy::Skip);
    let mut segments = vec![Segment::zeroed(4 * SECTOR_SIZE)];
    assert!(matches!(
        submit(&skip, Direction::Write, 0, &mut segments),
        Err(BlkError::OutOfRange { .. })
    ));
}

#[test]
fn zero_length_requests_on_zero_capacity_device() {
    let handle = create_device(0).unwrap();
    let mut segments = vec![Segment::zeroed(0)];
    assert!(matches!(
        submit(&handle, Direction::Write, 0, &mut segments),
        Err(BlkError::OutOfRange { len: 0, .. })
    ));
    let mut segments = Vec::new();
    assert!(matches!(
        submit(&handle, Direction::Read, 5, &mut segments),
        Err(BlkError::OutOfRange { .. })
    ));
    assert_eq!(handle.stats().range_errors, 2);

    // 有容量的设备上, 起点在设备内的空请求什么也不做
    let sized = create_device(4 * SECTOR_SIZE as u64).unwrap();
    let mut segments = Vec::new();
    assert_eq!(submit(&sized, Direction::Write, 3, &mut segments), Ok(()));
    assert!(submit(&sized, Direction::Write, 4, &mut segments).is_err());
}

#[test]
fn failed_allocation_registers_nothing() {
    let err = DeviceHandle::create(&Config {
        name: "oom_device".to_string(),
        capacity: u64::MAX & !511,
        ..Config::default()
    })
    .err();
    assert_eq!(
        err,
        Some(BlkError::OutOfMemory {
            requested: u64::MAX & !511
        })
    );
    assert_eq!(blk::registered_major("oom_device"), None);
}

#[test]
fn huge_queue_depth_is_rejected() {
    let err = DeviceHandle::create(&Config {
        name: "deep_queue".to_string(),
        queue_depth: usize::MAX,
        ..Config::default()
    })
    .err();
    assert!(matches!(err, Some(BlkError::InvalidConfig(_))));
    assert_eq!(blk::registered_major("deep_queue"), None);
}

#[test]
fn capacity_must_be_sector_multiple() {
    assert_eq!(
        create_device(1000).err(),
        Some(BlkError::Misaligned { len: 1000 })
    );
}

#[test]
fn round_trip_random_ranges() {
    let handle = create_device(256 * SECTOR_SIZE as u64).unwrap();
    for _ in 0..64 {
        let nsect = 1 + rand::random::<usize>() % 8;
        let sector = rand::random::<u64>() % (256 - nsect as u64 + 1);
        let data = random_bytes(nsect * SECTOR_SIZE);
        // 拆成每段一个扇区
        let mut segments: Vec<Segment> = data.chunks(SECTOR_SIZE).map(Segment::from_slice).collect();
        submit(&handle, Direction::Write, sector, &mut segments).unwrap();
        assert_eq!(read_sectors(&handle, sector, nsect), data);
    }
}

#[test]
fn reads_have_no_side_effects() {
    let handle = create_device(64 * SECTOR_SIZE as u64).unwrap();
    let data = random_bytes(4 * SECTOR_SIZE);
    submit(
        &handle,
        Direction::Write,
        8,
        &mut vec![Segment::new(data.clone())],
    )
    .unwrap();

    let first = read_sectors(&handle, 6, 8);
    let second = read_sectors(&handle, 6, 8);
    assert_eq!(first, second);
    assert_eq!(&first[2 * SECTOR_SIZE..6 * SECTOR_SIZE], &data[..]);
    assert_eq!(handle.stats().reads, 2);
}

#[test]
fn abort_keeps_earlier_segments_and_skips_later_ones() {
    let handle = device("abort_policy", 4 * SECTOR_SIZE as u64, RangePolicy::Abort);
    let mut segments = vec![
        Segment::new(vec![1; SECTOR_SIZE]),
        Segment::new(vec![2; 4 * SECTOR_SIZE]),
        Segment::new(vec![3; SECTOR_SIZE]),
    ];
    assert!(matches!(
        submit(&handle, Direction::Write, 0, &mut segments),
        Err(BlkError::OutOfRange { .. })
    ));
    // 段的所有权回到调用者
    assert_eq!(segments.len(), 3);
    assert_eq!(read_sectors(&handle, 0, 1), vec![1; SECTOR_SIZE]);
    // 第三段落在扇区 5, 本就越界; 第二段整体没有写入
    assert_eq!(read_sectors(&handle, 1, 3), vec![0; 3 * SECTOR_SIZE]);
}

#[test]
fn skip_writes_in_range_segments_after_a_bad_one() {
    let handle = device("skip_policy", 4 * SECTOR_SIZE as u64, RangePolicy::Skip);
    let mut req = Request::write(
        2,
        vec![
            Segment::new(vec![1; 4 * SECTOR_SIZE]),
            Segment::new(vec![2; SECTOR_SIZE]),
        ],
    );
    // 第一段 (2..6) 越界, 第二段落在扇区 6, 同样越界
    assert_eq!(handle.submit(&mut req), Err(BlkError::IoError { failed: 2 }));

    let mut req = Request::write(
        3,
        vec![
            Segment::new(vec![7; SECTOR_SIZE]),
            Segment::new(vec![8; SECTOR_SIZE]),
        ],
    );
    assert_eq!(handle.submit(&mut req), Err(BlkError::IoError { failed: 1 }));
    assert_eq!(read_sectors(&handle, 3, 1), vec![7; SECTOR_SIZE]);
    assert_eq!(handle.stats().range_errors, 3);
}

#[test]
fn concurrent_submitters_on_disjoint_ranges() {
    let handle = Arc::new(device(
        "concurrent",
        64 * SECTOR_SIZE as u64,
        RangePolicy::Abort,
    ));
    let workers: Vec<_> = (0..8u8)
        .map(|i| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || {
                let sector = i as u64 * 8;
                for round in 0..16u8 {
                    let fill = i.wrapping_mul(31).wrapping_add(round);
                    let mut req = Request::write(sector, vec![Segment::new(vec![fill; 8 * SECTOR_SIZE])]);
                    handle.submit(&mut req).unwrap();
                    assert_eq!(read_sectors(&handle, sector, 8), vec![fill; 8 * SECTOR_SIZE]);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(handle.stats().writes, 8 * 16);
}

#[test]
fn hardware_queues_return_read_data() {
    let handle = DeviceHandle::create(&Config {
        name: "hw_queues".to_string(),
        capacity: 128 * SECTOR_SIZE as u64,
        nr_hw_queues: 4,
        queue_depth: 2,
        ..Config::default()
    })
    .unwrap();

    let payloads: Vec<Vec<u8>> = (0..16).map(|_| random_bytes(2 * SECTOR_SIZE)).collect();
    let tickets: Vec<_> = payloads
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let req = Request::write(i as u64 * 2, vec![Segment::from_slice(data)]);
            handle.enqueue(req).unwrap()
        })
        .collect();
    for ticket in tickets {
        assert_eq!(ticket.wait().unwrap().result, Ok(()));
    }

    for (i, data) in payloads.iter().enumerate() {
        let done = handle
            .enqueue(Request::read(
                i as u64 * 2,
                vec![Segment::zeroed(SECTOR_SIZE), Segment::zeroed(SECTOR_SIZE)],
            ))
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(done.result, Ok(()));
        assert_eq!(&done.request.data(), data);
    }

    let done = handle
        .enqueue(Request::read(127, vec![Segment::zeroed(2 * SECTOR_SIZE)]))
        .unwrap()
        .wait()
        .unwrap();
    assert!(matches!(done.result, Err(BlkError::OutOfRange { .. })));
}

#[test]
fn destroy_releases_the_major_number() {
    let handle = device("lifecycle", 8 * SECTOR_SIZE as u64, RangePolicy::Abort);
    let major = handle.major();
    assert_eq!(blk::registered_name(major).as_deref(), Some("lifecycle"));
    assert_eq!(handle.dev_path(), "/dev/lifecycle");
    handle.destroy();
    assert_ne!(blk::registered_name(major).as_deref(), Some("lifecycle"));
}

#[test]
fn invalid_config_registers_nothing() {
    let err = DeviceHandle::create(&Config {
        name: "bad_queues".to_string(),
        nr_hw_queues: 0,
        ..Config::default()
    })
    .err();
    assert!(matches!(err, Some(BlkError::InvalidConfig(_))));
}

#[test]
fn fill_pattern_is_visible_before_any_write() {
    let handle = DeviceHandle::create(&Config {
        name: "fill_pattern".to_string(),
        capacity: 4 * SECTOR_SIZE as u64,
        fill: 0xAA,
        ..Config::default()
    })
    .unwrap();
    assert_eq!(read_sectors(&handle, 0, 4), vec![0xAA; 4 * SECTOR_SIZE]);
}
