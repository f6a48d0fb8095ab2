pub mod macros;

use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Clone, Copy, Default)]
pub struct PrintableDuration(pub Duration);

impl From<Duration> for PrintableDuration {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl std::fmt::Debug for PrintableDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0.as_secs();
        let millis = self.0.subsec_millis();
        write!(f, "{}.{:03}s", secs, millis)
    }
}

impl Serialize for PrintableDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = self.0.as_secs_f64();
        serializer.serialize_f64(secs)
    }
}

/// Counters of the synchronization events narrated during a run
#[derive(Clone, Debug, Default, Serialize)]
pub struct SyncStats {
    pub semaphores_created: u64,
    /// Permits granted by any semaphore
    pub acquires: u64,
    /// Acquires that found no permit and had to wait
    pub blocks: u64,
    pub wakeups: u64,
    pub releases: u64,
    pub critical_section_entries: u64,
    pub produced: u64,
    pub consumed: u64,
    pub max_buffer_occupancy: usize,
    pub elapsed: PrintableDuration,
}

impl SyncStats {
    pub const fn empty() -> Self {
        Self {
            semaphores_created: 0,
            acquires: 0,
            blocks: 0,
            wakeups: 0,
            releases: 0,
            critical_section_entries: 0,
            produced: 0,
            consumed: 0,
            max_buffer_occupancy: 0,
            elapsed: PrintableDuration(Duration::from_secs(0)),
        }
    }

    pub fn observe_occupancy(&mut self, occupancy: usize) {
        self.max_buffer_occupancy = self.max_buffer_occupancy.max(occupancy);
    }
}

pub static STATS: Mutex<SyncStats> = Mutex::new(SyncStats::empty());

pub fn write_stats(output_file: &Path) -> anyhow::Result<()> {
    let output_file = output_file.with_extension("json");
    let file = BufWriter::new(std::fs::File::create(&output_file)?);
    let mut stats = STATS.lock();
    stats.elapsed = crate::elapsed().into();
    serde_json::to_writer_pretty(file, &*stats)?;
    Ok(())
}
