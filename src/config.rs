//! 设备配置与命令行参数
//!
//! 默认值与 simple_block 驱动一致: 1MB 容量, 1 个硬件队列, 队列深度 128.

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

use crate::blk::{
    RangePolicy, BLK_MQ_MAX_DEPTH, DEFAULT_CAPACITY, DEFAULT_NR_HW_QUEUES, DEFAULT_QUEUE_DEPTH,
    DISK_NAME, MAX_NR_HW_QUEUES,
};
use crate::error::{BlkError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// 磁盘名, 设备路径为 /dev/<name>
    pub name: String,
    /// 容量 (字节), 必须是扇区大小的整数倍
    pub capacity: u64,
    /// 后备存储的初始填充字节
    pub fill: u8,
    pub policy: RangePolicy,
    pub nr_hw_queues: usize,
    pub queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: DISK_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            fill: 0,
            policy: RangePolicy::Abort,
            nr_hw_queues: DEFAULT_NR_HW_QUEUES,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(BlkError::InvalidConfig("disk name must not be empty"));
        }
        if self.nr_hw_queues == 0 {
            return Err(BlkError::InvalidConfig("need at least one hardware queue"));
        }
        if self.nr_hw_queues > MAX_NR_HW_QUEUES {
            return Err(BlkError::InvalidConfig("too many hardware queues"));
        }
        if self.queue_depth == 0 {
            return Err(BlkError::InvalidConfig("queue depth must be positive"));
        }
        if self.queue_depth > BLK_MQ_MAX_DEPTH {
            return Err(BlkError::InvalidConfig("queue depth exceeds BLK_MQ_MAX_DEPTH"));
        }
        Ok(())
    }

    /// 从命令行参数构造配置, 未给出的项取默认值
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let default = Self::default();
        let config = Self {
            name: matches
                .get_one::<String>("name")
                .cloned()
                .unwrap_or(default.name),
            capacity: match matches.get_one::<String>("capacity") {
                Some(s) => parse_size(s)?,
                None => default.capacity,
            },
            fill: match matches.get_one::<String>("fill") {
                Some(s) => parse_byte(s)?,
                None => default.fill,
            },
            policy: match matches.get_one::<String>("policy") {
                Some(s) => s.parse()?,
                None => default.policy,
            },
            nr_hw_queues: matches
                .get_one::<usize>("queues")
                .copied()
                .unwrap_or(default.nr_hw_queues),
            queue_depth: matches
                .get_one::<usize>("depth")
                .copied()
                .unwrap_or(default.queue_depth),
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn command() -> Command {
    Command::new("simple-blk")
        .about("In-memory block device exerciser")
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .action(ArgAction::Set)
                .help("Disk name, exposed as /dev/<name>"),
        )
        .arg(
            Arg::new("capacity")
                .short('c')
                .long("capacity")
                .action(ArgAction::Set)
                .help("Capacity in bytes, K/M/G suffixes allowed (default 1M)"),
        )
        .arg(
            Arg::new("fill")
                .short('f')
                .long("fill")
                .action(ArgAction::Set)
                .help("Initial fill byte of the backing store, e.g. 0xAA"),
        )
        .arg(
            Arg::new("policy")
                .short('p')
                .long("policy")
                .action(ArgAction::Set)
                .value_parser(["abort", "skip"])
                .help("What to do with beyond-end segments"),
        )
        .arg(
            Arg::new("queues")
                .short('q')
                .long("queues")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(usize))
                .help("Number of hardware queues"),
        )
        .arg(
            Arg::new("depth")
                .short('d')
                .long("depth")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(usize))
                .help("Requests in flight per hardware queue"),
        )
        .arg(
            Arg::new("log")
                .short('l')
                .long("log")
                .action(ArgAction::Set)
                .value_parser(["off", "error", "warn", "info", "debug", "trace"])
                .help("Log level (default: $LOG or info)"),
        )
}

/// 日志级别: 命令行优先, 其次是 LOG 环境变量
pub fn log_level(matches: &ArgMatches) -> LevelFilter {
    matches
        .get_one::<String>("log")
        .cloned()
        .or_else(|| std::env::var("LOG").ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// "4096", "16K", "1M", "2G"
pub fn parse_size(s: &str) -> Result<u64> {
    const BAD: BlkError = BlkError::InvalidConfig("bad size");
    let s = s.trim();
    let (digits, shift) = match s.char_indices().last() {
        Some((idx, 'k' | 'K')) => (&s[..idx], 10),
        Some((idx, 'm' | 'M')) => (&s[..idx], 20),
        Some((idx, 'g' | 'G')) => (&s[..idx], 30),
        _ => (s, 0),
    };
    let n: u64 = digits.parse().map_err(|_| BAD)?;
    n.checked_mul(1 << shift).ok_or(BAD)
}

/// 十进制或 0x 开头的十六进制
pub fn parse_byte(s: &str) -> Result<u8> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| BlkError::InvalidConfig("fill must be a byte"))
}
