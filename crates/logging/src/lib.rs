pub mod stats;

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    Info = 0,
    Warning = 1,
    Error = 2,
}

static MESSAGES_CALLBACK: Mutex<Option<fn(MessageLevel, &str)>> = Mutex::new(None);

/// Monotonic origin of the timestamps printed by the default sink
static LOG_START_TIME: Mutex<Option<Instant>> = Mutex::new(None);

pub fn setup_logging_callback(callback: fn(MessageLevel, &str)) {
    let mut messages_callback = MESSAGES_CALLBACK.lock();
    *messages_callback = Some(callback);
}

/// Time elapsed since the first logged message, or since this call if nothing was logged yet
pub fn elapsed() -> Duration {
    LOG_START_TIME.lock().get_or_insert_with(Instant::now).elapsed()
}

pub fn log(level: MessageLevel, message: &str) {
    let messages_callback = MESSAGES_CALLBACK.lock();
    if let Some(callback) = &*messages_callback {
        callback(level, message);
    } else {
        let timestamp = elapsed().as_secs_f64();
        match level {
            MessageLevel::Error => eprintln!("[{:>8.3}s] {}", timestamp, message),
            _ => println!("[{:>8.3}s] {}", timestamp, message),
        }
    }
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log($crate::MessageLevel::Info, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log($crate::MessageLevel::Warning, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log($crate::MessageLevel::Error, &format!($($arg)*));
    };
}
