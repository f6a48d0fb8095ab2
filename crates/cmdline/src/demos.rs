use config::{
    scaled, scaled_secs, CONSUMER_DELAY_SECS, CONSUMER_START_DELAY, CS_THREAD_STAGGER,
    CS_WORK_SECS, PRODUCER_DELAY_SECS,
};
use rand::Rng;
use semabuf_logging::info;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use sync::{BoundedBuffer, CriticalSection, SyncObserver};

pub struct BufferDemoSetup {
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub items_per_producer: usize,
}

impl Default for BufferDemoSetup {
    fn default() -> Self {
        Self {
            capacity: config::DEFAULT_BUFFER_CAPACITY,
            producers: config::DEFAULT_PRODUCERS,
            consumers: config::DEFAULT_CONSUMERS,
            items_per_producer: config::DEFAULT_ITEMS_PER_PRODUCER,
        }
    }
}

fn random_delay(range: RangeInclusive<f64>) -> Duration {
    scaled_secs(rand::thread_rng().gen_range(range))
}

fn spawn_named<R: Send + 'static>(
    name: String,
    work: impl FnOnce() -> R + Send + 'static,
) -> anyhow::Result<(String, JoinHandle<R>)> {
    let handle = thread::Builder::new().name(name.clone()).spawn(work)?;
    Ok((name, handle))
}

/// A panicked thread becomes an error for the caller to report
fn join_named<R>((name, handle): (String, JoinHandle<R>)) -> anyhow::Result<R> {
    let result = handle
        .join()
        .map_err(|_| anyhow::anyhow!("Thread {} panicked", name))?;
    info!("Thread {} completed", name);
    Ok(result)
}

/// Staggered threads entering a critical section to simulate some work
pub fn critical_section(threads: usize, observer: Arc<dyn SyncObserver>) -> anyhow::Result<()> {
    info!("===== CRITICAL SECTION DEMONSTRATION =====");

    let section = Arc::new(CriticalSection::with_observer(observer));
    let mut handles = Vec::with_capacity(threads);

    for process in 1..=threads {
        let section = section.clone();
        info!("Starting thread for Process {}", process);
        handles.push(spawn_named(format!("CSThread-{}", process), move || {
            section.run(|| {
                let work = random_delay(CS_WORK_SECS);
                info!(
                    "Process {} RUNNING CS for {:.2} seconds",
                    process,
                    work.as_secs_f64()
                );
                thread::sleep(work);
            })
        })?);
        thread::sleep(scaled(CS_THREAD_STAGGER));
    }

    for handle in handles {
        join_named(handle)?;
    }

    info!("===== CRITICAL SECTION DEMONSTRATION COMPLETE =====");
    Ok(())
}

/// Producers filling a small buffer while slower consumers drain it
pub fn bounded_buffer(
    setup: BufferDemoSetup,
    observer: Arc<dyn SyncObserver>,
) -> anyhow::Result<()> {
    let total_items = setup.producers * setup.items_per_producer;
    anyhow::ensure!(
        setup.consumers > 0 || total_items == 0,
        "At least one consumer is needed to drain {} items",
        total_items
    );

    info!("===== BOUNDED BUFFER DEMONSTRATION =====");
    info!("Creating Bounded Buffer with size {}", setup.capacity);

    let buffer = Arc::new(BoundedBuffer::<String>::with_observer(
        setup.capacity,
        observer,
    )?);

    let mut producers = Vec::with_capacity(setup.producers);
    for producer in 0..setup.producers {
        let buffer = buffer.clone();
        let items = setup.items_per_producer;
        producers.push(spawn_named(format!("Producer-{}", producer + 1), move || {
            for index in 1..=items {
                buffer.produce(format!("Item-{}", producer * items + index));

                let delay = random_delay(PRODUCER_DELAY_SECS);
                info!("Producer sleeping for {:.2} seconds", delay.as_secs_f64());
                thread::sleep(delay);
            }
        })?);
    }

    // Consumers start late, so the buffer fills up and producers have to wait
    thread::sleep(scaled(CONSUMER_START_DELAY));

    let mut consumers = Vec::with_capacity(setup.consumers);
    for consumer in 0..setup.consumers {
        let buffer = buffer.clone();
        consumers.push(spawn_named(format!("Consumer-{}", consumer + 1), move || {
            let mut consumed = 0usize;
            while buffer.consume_or_closed().is_some() {
                consumed += 1;

                let delay = random_delay(CONSUMER_DELAY_SECS);
                info!("Consumer sleeping for {:.2} seconds", delay.as_secs_f64());
                thread::sleep(delay);
            }
            consumed
        })?);
    }

    for producer in producers {
        join_named(producer)?;
    }
    // Every item is in the buffer or already consumed, let the consumers drain and stop
    buffer.close();

    let mut total_consumed = 0;
    for consumer in consumers {
        total_consumed += join_named(consumer)?;
    }

    anyhow::ensure!(
        total_consumed == total_items,
        "Consumed {} items out of {}",
        total_consumed,
        total_items
    );

    info!("===== BOUNDED BUFFER DEMONSTRATION COMPLETE =====");
    Ok(())
}
