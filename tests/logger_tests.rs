use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use deferlog::{record, CondvarPlatform, LocalLogger, LogServer};

/// Collects everything the consumer writes so tests can inspect it after
/// shutdown.
#[derive(Clone)]
struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn leaked_server<const MAX: usize>(
    writer: SharedWriter,
) -> &'static LogServer<SharedWriter, CondvarPlatform, MAX> {
    Box::leak(Box::new(LogServer::new(CondvarPlatform::new(), writer)))
}

#[test]
fn single_producer_delivers_in_order() {
    let output = SharedWriter::new();
    let server = leaked_server::<4>(output.clone());
    let consumer = thread::spawn(move || server.run_consumer());

    let producer = thread::spawn(move || {
        let logger: &'static LocalLogger<8, 16384> = Box::leak(Box::new(LocalLogger::new()));
        let mut log = logger.producer().unwrap();
        server.register(&mut log);
        for n in 0..1024u32 {
            record!(log, "{}", n);
        }
        log.flush();
    });
    producer.join().unwrap();

    server.shutdown();
    consumer.join().unwrap();

    let lines = output.lines();
    assert_eq!(lines.len(), 1024);
    for (expected, line) in lines.iter().enumerate() {
        assert_eq!(line.parse::<usize>().unwrap(), expected);
    }
}

#[test]
fn order_survives_arena_rollover() {
    // 32-byte records, 64-byte arenas: every third record rolls the ring.
    let output = SharedWriter::new();
    let server = leaked_server::<4>(output.clone());
    let consumer = thread::spawn(move || server.run_consumer());

    let producer = thread::spawn(move || {
        let logger: &'static LocalLogger<8, 64> = Box::leak(Box::new(LocalLogger::new()));
        let mut log = logger.producer().unwrap();
        server.register(&mut log);
        // Ten records span five arenas, well under the ring capacity even
        // if the consumer never gets scheduled until shutdown.
        for n in 0..10u32 {
            record!(log, "{}", n);
        }
        log.flush();
    });
    producer.join().unwrap();

    server.shutdown();
    consumer.join().unwrap();

    let received: Vec<u32> = output
        .lines()
        .iter()
        .map(|line| line.parse().unwrap())
        .collect();
    assert_eq!(received, (0..10).collect::<Vec<u32>>());
}

#[test]
fn no_records_lost_across_intermediate_flushes() {
    let output = SharedWriter::new();
    let server = leaked_server::<4>(output.clone());
    let consumer = thread::spawn(move || server.run_consumer());

    let producer = thread::spawn(move || {
        // Sixteen arenas: ten flushed batches can stay outstanding without
        // ever filling the ring.
        let logger: &'static LocalLogger<16, 1024> = Box::leak(Box::new(LocalLogger::new()));
        let mut log = logger.producer().unwrap();
        server.register(&mut log);
        for batch in 0..10u32 {
            for n in 0..20u32 {
                record!(log, "{}", batch * 20 + n);
            }
            log.flush();
        }
    });
    producer.join().unwrap();

    server.shutdown();
    consumer.join().unwrap();

    let lines = output.lines();
    assert_eq!(lines.len(), 200);
    for (expected, line) in lines.iter().enumerate() {
        assert_eq!(line.parse::<usize>().unwrap(), expected);
    }
}

#[test]
fn four_producers_keep_per_tag_order() {
    let output = SharedWriter::new();
    let server = leaked_server::<4>(output.clone());
    let consumer = thread::spawn(move || server.run_consumer());

    let tags = ["a", "b", "c", "d"];
    let mut producers = Vec::new();
    for tag in tags {
        producers.push(thread::spawn(move || {
            let logger: &'static LocalLogger<8, 16384> =
                Box::leak(Box::new(LocalLogger::new()));
            let mut log = logger.producer().unwrap();
            server.register(&mut log);
            for n in 0..1024u32 {
                record!(log, "{} {}", tag, n);
            }
            log.flush();
        }));
    }
    for producer in producers {
        producer.join().unwrap();
    }

    server.shutdown();
    consumer.join().unwrap();

    let lines = output.lines();
    assert_eq!(lines.len(), 4 * 1024);
    for tag in tags {
        let prefix = format!("{} ", tag);
        let tagged: Vec<u32> = lines
            .iter()
            .filter_map(|line| line.strip_prefix(&prefix))
            .map(|rest| rest.parse().unwrap())
            .collect();
        assert_eq!(tagged, (0..1024).collect::<Vec<u32>>());
    }
}

#[test]
fn shutdown_drains_flushed_records() {
    let output = SharedWriter::new();
    let server = leaked_server::<4>(output.clone());
    let consumer = thread::spawn(move || server.run_consumer());

    let producer = thread::spawn(move || {
        let logger: &'static LocalLogger<8, 1024> = Box::leak(Box::new(LocalLogger::new()));
        let mut log = logger.producer().unwrap();
        server.register(&mut log);
        for n in 0..10u32 {
            record!(log, "pending {}", n);
        }
        log.flush();
    });
    producer.join().unwrap();

    server.shutdown();
    consumer.join().unwrap();

    assert_eq!(output.lines().len(), 10);
}
