mod demos;

use backtrace::Backtrace;
use semabuf_logging::{error, info};
use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use structopt::StructOpt;
use sync::{LoggingObserver, NoopObserver, SyncObserver};

#[derive(StructOpt, Debug)]
enum CliArgs {
    /// Threads competing for a one-permit semaphore
    CriticalSection(CriticalSectionArgs),
    /// Producers and consumers sharing a bounded buffer
    BoundedBuffer(BoundedBufferArgs),
    /// Both demonstrations, one after the other
    All(AllArgs),
}

#[derive(StructOpt, Debug)]
struct CommonArgs {
    /// Do not narrate the semaphore and buffer state transitions
    #[structopt(short, long)]
    pub quiet: bool,

    /// Multiplies every sleep of the demo, 0 runs without pauses
    #[structopt(long = "time-scale", default_value = "1.0")]
    pub time_scale: f64,

    /// Write the synchronization counters to this json file at exit
    #[structopt(long = "stats-file")]
    pub stats_file: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
struct CriticalSectionArgs {
    /// Number of threads entering the critical section
    #[structopt(short = "n", long = "threads")]
    pub threads: Option<usize>,

    #[structopt(flatten)]
    pub common_args: CommonArgs,
}

#[derive(StructOpt, Debug)]
struct BoundedBufferArgs {
    /// Maximum number of items resident in the buffer
    #[structopt(short = "c", long = "capacity")]
    pub capacity: Option<usize>,

    #[structopt(short = "p", long = "producers")]
    pub producers: Option<usize>,

    #[structopt(short = "k", long = "consumers")]
    pub consumers: Option<usize>,

    /// Items generated by each producer
    #[structopt(short = "i", long = "items")]
    pub items: Option<usize>,

    #[structopt(flatten)]
    pub common_args: CommonArgs,
}

#[derive(StructOpt, Debug)]
struct AllArgs {
    #[structopt(short = "n", long = "threads")]
    pub threads: Option<usize>,

    #[structopt(short = "c", long = "capacity")]
    pub capacity: Option<usize>,

    #[structopt(flatten)]
    pub common_args: CommonArgs,
}

fn initialize(args: &CommonArgs) -> Arc<dyn SyncObserver> {
    config::set_time_scale(args.time_scale);
    if args.quiet {
        NoopObserver::shared()
    } else {
        LoggingObserver::shared()
    }
}

fn finalize(args: &CommonArgs) -> anyhow::Result<()> {
    if let Some(stats_file) = &args.stats_file {
        semabuf_logging::stats::write_stats(stats_file)?;
        info!("Stats written to {}", stats_file.with_extension("json").display());
    }
    Ok(())
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    match args {
        CliArgs::CriticalSection(args) => {
            let observer = initialize(&args.common_args);
            demos::critical_section(
                args.threads.unwrap_or(config::DEFAULT_CS_THREADS),
                observer,
            )?;
            finalize(&args.common_args)
        }
        CliArgs::BoundedBuffer(args) => {
            let observer = initialize(&args.common_args);
            demos::bounded_buffer(
                demos::BufferDemoSetup {
                    capacity: args.capacity.unwrap_or(config::DEFAULT_BUFFER_CAPACITY),
                    producers: args.producers.unwrap_or(config::DEFAULT_PRODUCERS),
                    consumers: args.consumers.unwrap_or(config::DEFAULT_CONSUMERS),
                    items_per_producer: args
                        .items
                        .unwrap_or(config::DEFAULT_ITEMS_PER_PRODUCER),
                },
                observer,
            )?;
            finalize(&args.common_args)
        }
        CliArgs::All(args) => {
            let observer = initialize(&args.common_args);
            demos::critical_section(
                args.threads.unwrap_or(config::DEFAULT_CS_THREADS),
                observer.clone(),
            )?;

            let pause = config::scaled(config::DEMOS_PAUSE);
            info!(
                "Waiting {:.1} seconds before starting the bounded buffer test...",
                pause.as_secs_f64()
            );
            std::thread::sleep(pause);

            demos::bounded_buffer(
                demos::BufferDemoSetup {
                    capacity: args.capacity.unwrap_or(config::DEFAULT_BUFFER_CAPACITY),
                    ..Default::default()
                },
                observer,
            )?;
            info!("All demonstrations completed");
            finalize(&args.common_args)
        }
    }
}

fn main() {
    let args: CliArgs = CliArgs::from_args();

    panic::set_hook(Box::new(move |info| {
        let stderr = std::io::stderr();
        let mut err_lock = stderr.lock();

        if let Some(location) = info.location() {
            let _ = writeln!(err_lock, "Thread panicked at location: {}", location);
        }
        if let Some(s) = info.payload().downcast_ref::<&str>() {
            let _ = writeln!(err_lock, "Panic payload: {:?}", s);
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            let _ = writeln!(err_lock, "Panic payload: {:?}", s);
        }

        let _ = writeln!(err_lock, "Backtrace: {:?}", Backtrace::new());

        exit(1);
    }));

    if let Err(err) = run(args) {
        error!("Error: {:#}", err);
        exit(1);
    }
}
