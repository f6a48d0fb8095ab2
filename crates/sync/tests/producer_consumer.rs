use crossbeam::channel::unbounded;
use parking_lot::Mutex;
use rand::Rng;
use semabuf_logging::{get_stat, setup_logging_callback, MessageLevel};
use semabuf_sync::{BoundedBuffer, LoggingObserver, SyncEvent, SyncObserver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Tracks the occupancy reported by every buffer event
#[derive(Default)]
struct OccupancyObserver {
    max_len: AtomicUsize,
    events: AtomicUsize,
    capacity_violations: AtomicUsize,
}

impl SyncObserver for OccupancyObserver {
    fn on_event(&self, event: &SyncEvent<'_>) {
        let buffer = match event {
            SyncEvent::Produced { buffer, .. } | SyncEvent::Consumed { buffer, .. } => buffer,
            _ => return,
        };
        self.events.fetch_add(1, Ordering::SeqCst);
        self.max_len.fetch_max(buffer.len, Ordering::SeqCst);
        if buffer.len > buffer.capacity {
            self.capacity_violations.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn random_pause() {
    let micros = rand::thread_rng().gen_range(0..200);
    thread::sleep(Duration::from_micros(micros));
}

#[test]
fn single_producer_single_consumer_is_fifo() {
    const ITEMS: usize = 5_000;
    let buffer = BoundedBuffer::<usize>::new(4).unwrap();

    let received = thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..ITEMS {
                buffer.produce(i);
            }
        });
        let consumer = scope.spawn(|| (0..ITEMS).map(|_| buffer.consume()).collect::<Vec<_>>());
        consumer.join().unwrap()
    });

    assert_eq!(received, (0..ITEMS).collect::<Vec<_>>());
    assert!(buffer.is_empty());
}

#[test]
fn occupancy_stays_within_capacity() {
    const CAPACITY: usize = 3;
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 3;
    const ITEMS_PER_PRODUCER: usize = 300;

    let observer = Arc::new(OccupancyObserver::default());
    let buffer = BoundedBuffer::with_observer(CAPACITY, observer.clone()).unwrap();
    let consumed = AtomicUsize::new(0);
    let total = PRODUCERS * ITEMS_PER_PRODUCER;

    let mut delivered = thread::scope(|scope| {
        for producer in 0..PRODUCERS {
            let buffer = &buffer;
            scope.spawn(move || {
                for i in 0..ITEMS_PER_PRODUCER {
                    buffer.produce(producer * ITEMS_PER_PRODUCER + i);
                    random_pause();
                }
            });
        }

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                scope.spawn(|| {
                    let mut items = Vec::new();
                    while consumed.fetch_add(1, Ordering::SeqCst) < total {
                        items.push(buffer.consume());
                        assert!(buffer.len() <= CAPACITY);
                        random_pause();
                    }
                    items
                })
            })
            .collect();

        consumers
            .into_iter()
            .flat_map(|consumer| consumer.join().unwrap())
            .collect::<Vec<_>>()
    });

    delivered.sort_unstable();
    assert_eq!(delivered, (0..total).collect::<Vec<_>>());
    assert_eq!(observer.capacity_violations.load(Ordering::SeqCst), 0);
    assert!(observer.max_len.load(Ordering::SeqCst) <= CAPACITY);
    assert_eq!(observer.events.load(Ordering::SeqCst), 2 * total);
    assert_eq!(buffer.slot_counts(), (CAPACITY, 0));
}

#[test]
fn items_of_one_producer_keep_their_order() {
    let buffer = BoundedBuffer::<(usize, usize)>::new(2).unwrap();

    let received = thread::scope(|scope| {
        for producer in 0..3 {
            let buffer = &buffer;
            scope.spawn(move || {
                for i in 0..200 {
                    buffer.produce((producer, i));
                }
            });
        }
        (0..600).map(|_| buffer.consume()).collect::<Vec<_>>()
    });

    for producer in 0..3 {
        let sequence: Vec<_> = received
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, i)| *i)
            .collect();
        assert_eq!(sequence, (0..200).collect::<Vec<_>>());
    }
}

#[test]
fn full_single_slot_buffer_unblocks_producer() {
    let buffer = Arc::new(BoundedBuffer::<&str>::new(1).unwrap());
    let (done_tx, done_rx) = unbounded();

    let producer = {
        let buffer = buffer.clone();
        thread::spawn(move || {
            buffer.produce("first");
            buffer.produce("second");
            done_tx.send(()).unwrap();
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(done_rx.try_recv().is_err(), "second produce did not block");
    assert_eq!(buffer.snapshot(), vec!["first"]);

    assert_eq!(buffer.consume(), "first");
    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("producer stayed blocked after consume");
    producer.join().unwrap();
    assert_eq!(buffer.consume(), "second");
}

#[test]
fn blocked_consumer_is_never_lost() {
    for round in 0..50 {
        let buffer = Arc::new(BoundedBuffer::<usize>::new(2).unwrap());
        let (item_tx, item_rx) = unbounded();
        let consumer = {
            let buffer = buffer.clone();
            thread::spawn(move || item_tx.send(buffer.consume()).unwrap())
        };
        random_pause();
        buffer.produce(round);
        assert_eq!(item_rx.recv_timeout(Duration::from_secs(5)), Ok(round));
        consumer.join().unwrap();
    }
}

#[test]
fn close_lets_consumers_drain_and_stop() {
    let buffer = BoundedBuffer::<u32>::new(3).unwrap();

    let drained = thread::scope(|scope| {
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    let mut items = Vec::new();
                    while let Some(item) = buffer.consume_or_closed() {
                        items.push(item);
                    }
                    items
                })
            })
            .collect();

        for item in 0..20 {
            buffer.produce(item);
        }
        buffer.close();

        consumers
            .into_iter()
            .flat_map(|consumer| consumer.join().unwrap())
            .collect::<Vec<_>>()
    });

    let mut drained = drained;
    drained.sort_unstable();
    assert_eq!(drained, (0..20).collect::<Vec<_>>());
}

#[test]
fn close_during_production_loses_no_item() {
    const PRODUCERS: u32 = 4;
    const ITEMS: u32 = 200;

    for _ in 0..20 {
        let buffer = BoundedBuffer::<u32>::new(2).unwrap();

        let (mut accounted, consumed) = thread::scope(|scope| {
            let producers: Vec<_> = (0..PRODUCERS)
                .map(|producer| {
                    let buffer = &buffer;
                    scope.spawn(move || {
                        let mut returned = Vec::new();
                        for item in producer * ITEMS..(producer + 1) * ITEMS {
                            if let Err(item) = buffer.produce_or_closed(item) {
                                returned.push(item);
                            }
                        }
                        returned
                    })
                })
                .collect();
            let consumers: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(|| {
                        let mut items = Vec::new();
                        while let Some(item) = buffer.consume_or_closed() {
                            items.push(item);
                        }
                        items
                    })
                })
                .collect();

            thread::sleep(Duration::from_micros(rand::thread_rng().gen_range(0..2000)));
            buffer.close();

            let returned: Vec<_> = producers
                .into_iter()
                .flat_map(|producer| producer.join().unwrap())
                .collect();
            let consumed: Vec<_> = consumers
                .into_iter()
                .flat_map(|consumer| consumer.join().unwrap())
                .collect();
            (returned, consumed)
        });

        assert!(buffer.is_empty(), "items left behind after every consumer stopped");
        accounted.extend(consumed);
        accounted.sort_unstable();
        assert_eq!(accounted, (0..PRODUCERS * ITEMS).collect::<Vec<_>>());
    }
}

static MESSAGES: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn capture_message(_level: MessageLevel, message: &str) {
    MESSAGES.lock().push(message.to_string());
}

#[test]
fn logging_observer_narrates_and_counts() {
    setup_logging_callback(capture_message);

    let buffer = BoundedBuffer::with_observer(2, LoggingObserver::shared()).unwrap();
    buffer.produce("Item-1");
    assert_eq!(buffer.consume(), "Item-1");

    let messages = MESSAGES.lock().clone();
    let contains = |needle: &str| messages.iter().any(|m| m.contains(needle));
    assert!(contains("Empty_Slots initialized with value 2"));
    assert!(contains("Full_Slots initialized with value 0"));
    assert!(contains("PRODUCED item \"Item-1\""));
    assert!(contains("CONSUMED item \"Item-1\""));
    assert!(contains("Buffer after consumption: [] [0/2]"));

    assert!(get_stat!(stats.produced) >= 1);
    assert!(get_stat!(stats.consumed) >= 1);
    assert!(get_stat!(stats.max_buffer_occupancy) >= 1);
}
