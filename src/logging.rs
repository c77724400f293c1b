//! 全局日志
//!
//! 库里只通过 log 宏输出, 由可执行文件调用 [`init`] 安装这里的 logger.
//! 输出格式: `[时间 级别 target] 消息`, 按级别着色, 写到 stderr.

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

struct SimpleLogger;

/// 防止多个工作线程的输出交错在同一行
static OUTPUT: Mutex<()> = Mutex::new(());

static LOGGER: SimpleLogger = SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _guard = OUTPUT.lock();
        eprintln!(
            "\u{1B}[{}m[{} {:>5} {}] {}\u{1B}[0m",
            level_to_color_code(record.level()),
            Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // Red
        Level::Warn => 93,  // BrightYellow
        Level::Info => 34,  // Blue
        Level::Debug => 32, // Green
        Level::Trace => 90, // BrightBlack
    }
}

/// 安装 logger. 重复调用只会修改级别
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
