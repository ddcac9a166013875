use std::io;
use std::thread;
use std::time::{Duration, Instant};

use deferlog::{record, CondvarPlatform, LocalLogger, LogServer};

const ARENAS: usize = 8;
const ARENA_BYTES: usize = 16 * 1024;
const RECORDS: u32 = 1024;

type DemoServer = LogServer<io::Stdout, CondvarPlatform, 4>;

static LOGGERS: [LocalLogger<ARENAS, ARENA_BYTES>; 4] =
    [const { LocalLogger::new() }; 4];

/// One producer thread: registers its logger, then measures the deferred
/// record path against eager formatting of the same line.
fn produce(
    tag: &'static str,
    logger: &'static LocalLogger<ARENAS, ARENA_BYTES>,
    server: &'static DemoServer,
) {
    let mut log = match logger.producer() {
        Some(producer) => producer,
        None => return,
    };
    server.register(&mut log);

    let mut deferred = Duration::ZERO;
    let mut eager = Duration::ZERO;

    for n in 0..RECORDS {
        let t0 = Instant::now();
        record!(log, "df[{}] n: {}", tag, n);
        let t1 = Instant::now();
        let line = format!("fm[{}] n: {}", tag, n);
        let t2 = Instant::now();

        deferred += t1 - t0;
        eager += t2 - t1;
        std::hint::black_box(&line);
    }

    record!(
        log,
        "times[{}]: deferred {} us, eager format {} us",
        tag,
        deferred.as_micros() as u64,
        eager.as_micros() as u64
    );
    log.flush();
}

fn main() {
    let server: &'static DemoServer = Box::leak(Box::new(LogServer::new(
        CondvarPlatform::new(),
        io::stdout(),
    )));
    let consumer = thread::spawn(move || server.run_consumer());

    let tags = ["a", "b", "c", "d"];
    let mut producers = Vec::new();
    for (logger, tag) in LOGGERS.iter().zip(tags) {
        producers.push(thread::spawn(move || produce(tag, logger, server)));
    }
    for producer in producers {
        producer.join().unwrap();
    }

    server.shutdown();
    consumer.join().unwrap();
    println!("done");
}
