use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const CRITICAL_SECTION_SEMAPHORE_NAME: &str = "CS_mutex";
pub const EMPTY_SLOTS_SEMAPHORE_NAME: &str = "Empty_Slots";
pub const FULL_SLOTS_SEMAPHORE_NAME: &str = "Full_Slots";

/// Small enough to make producers wait quickly
pub const DEFAULT_BUFFER_CAPACITY: usize = 3;

pub const DEFAULT_CS_THREADS: usize = 3;
pub const DEFAULT_PRODUCERS: usize = 1;
pub const DEFAULT_CONSUMERS: usize = 1;
pub const DEFAULT_ITEMS_PER_PRODUCER: usize = 5;

/// Seconds a producer sleeps after each produced item
pub const PRODUCER_DELAY_SECS: RangeInclusive<f64> = 0.5..=1.5;
/// Seconds a consumer sleeps after each consumed item
pub const CONSUMER_DELAY_SECS: RangeInclusive<f64> = 0.7..=2.0;
/// Seconds of simulated work inside the critical section
pub const CS_WORK_SECS: RangeInclusive<f64> = 1.0..=3.0;

pub const CS_THREAD_STAGGER: Duration = Duration::from_millis(200);
/// Lets the buffer accumulate some items before the consumers start
pub const CONSUMER_START_DELAY: Duration = Duration::from_millis(1500);
pub const DEMOS_PAUSE: Duration = Duration::from_secs(3);

/// Bits of the `f64` multiplier applied to every demo delay, 0.0 disables sleeping
pub static TIME_SCALE: AtomicU64 = AtomicU64::new(ONE_F64_BITS);
const ONE_F64_BITS: u64 = 0x3FF0_0000_0000_0000;

pub fn time_scale() -> f64 {
    f64::from_bits(TIME_SCALE.load(Ordering::Relaxed))
}

pub fn set_time_scale(scale: f64) {
    TIME_SCALE.store(scale.max(0.0).to_bits(), Ordering::Relaxed);
}

pub fn scaled(duration: Duration) -> Duration {
    duration.mul_f64(time_scale())
}

pub fn scaled_secs(secs: f64) -> Duration {
    scaled(Duration::from_secs_f64(secs.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_ranges_are_well_formed() {
        for range in [PRODUCER_DELAY_SECS, CONSUMER_DELAY_SECS, CS_WORK_SECS] {
            assert!(range.start() > &0.0);
            assert!(range.start() <= range.end());
        }
    }

    #[test]
    fn time_scale_multiplies_delays() {
        assert_eq!(f64::from_bits(ONE_F64_BITS), 1.0);

        set_time_scale(0.5);
        assert_eq!(time_scale(), 0.5);
        assert_eq!(scaled(Duration::from_secs(2)), Duration::from_secs(1));
        set_time_scale(-4.0);
        assert_eq!(scaled_secs(1.5), Duration::ZERO);
        set_time_scale(1.0);
    }
}
