//! Pull/commit interleaving: the driver must not read ahead of the sink.

use std::cell::RefCell;
use std::io::{self, Read};
use std::rc::Rc;
use std::time::Duration;

use linestream_rs::{
    Chunk, ChunkSource, Pipeline, PipelineConfig, PipelineError, ReaderSource, Record, Sink,
    SinkError, SourceError,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Pull(usize),
    Commit(u64),
    Finish,
}

type Log = Rc<RefCell<Vec<Event>>>;

struct LoggingSource {
    chunks: Vec<&'static str>,
    next: usize,
    log: Log,
}

impl ChunkSource for LoggingSource {
    fn next_chunk(&mut self) -> Result<Option<Chunk>, SourceError> {
        self.log.borrow_mut().push(Event::Pull(self.next));
        let chunk = self.chunks.get(self.next).map(|c| Chunk::from(*c));
        self.next += 1;
        Ok(chunk)
    }
}

struct SlowLoggingSink {
    delay: Duration,
    log: Log,
}

impl Sink for SlowLoggingSink {
    fn commit(&mut self, record: Record) -> Result<(), SinkError> {
        std::thread::sleep(self.delay);
        self.log.borrow_mut().push(Event::Commit(record.number()));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.log.borrow_mut().push(Event::Finish);
        Ok(())
    }
}

#[test]
fn next_chunk_waits_for_pending_commits() {
    let log: Log = Rc::default();
    let source = LoggingSource {
        chunks: vec!["a\nb\nc", "\n", "", "d\ne"],
        next: 0,
        log: log.clone(),
    };
    let sink = SlowLoggingSink {
        delay: Duration::from_millis(2),
        log: log.clone(),
    };

    let summary = Pipeline::new(PipelineConfig::default())
        .unwrap()
        .run(source, sink)
        .unwrap();
    assert_eq!(summary.records, 5);

    use Event::*;
    assert_eq!(
        *log.borrow(),
        vec![
            Pull(0),
            Commit(1),
            Commit(2),
            Pull(1),
            Commit(3),
            Pull(2),
            Pull(3),
            Commit(4),
            Pull(4),
            Commit(5),
            Finish,
        ]
    );
}

#[test]
fn failure_stops_pulling() {
    struct FailingSink {
        log: Log,
    }

    impl Sink for FailingSink {
        fn commit(&mut self, record: Record) -> Result<(), SinkError> {
            self.log.borrow_mut().push(Event::Commit(record.number()));
            Err(SinkError::Write {
                record: record.number(),
                source: io::Error::other("display detached"),
            })
        }

        fn finish(&mut self) -> Result<(), SinkError> {
            self.log.borrow_mut().push(Event::Finish);
            Ok(())
        }
    }

    let log: Log = Rc::default();
    let source = LoggingSource {
        chunks: vec!["a\nb\n", "c\n"],
        next: 0,
        log: log.clone(),
    };
    let err = Pipeline::new(PipelineConfig::default())
        .unwrap()
        .run(source, FailingSink { log: log.clone() })
        .unwrap_err();

    assert!(matches!(err, PipelineError::Sink(_)));
    assert_eq!(*log.borrow(), vec![Event::Pull(0), Event::Commit(1)]);
}

/// Reader that counts how many bytes have been handed out.
struct CountingReader {
    data: io::Cursor<Vec<u8>>,
    served: Rc<RefCell<u64>>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        *self.served.borrow_mut() += n as u64;
        Ok(n)
    }
}

#[test]
fn reader_is_never_ahead_of_the_sink() {
    struct CheckingSink {
        served: Rc<RefCell<u64>>,
        high_water_mark: u64,
        committed_bytes: u64,
    }

    impl Sink for CheckingSink {
        fn commit(&mut self, record: Record) -> Result<(), SinkError> {
            // Bytes read so far can exceed what was committed by at most
            // one chunk plus the unterminated carry of a 9-byte line.
            let prefix = format!("{}: ", record.number()).len() as u64;
            let line_len = record.as_str().len() as u64 - prefix;
            self.committed_bytes += line_len;
            let served = *self.served.borrow();
            assert!(
                served <= self.committed_bytes + self.high_water_mark + 9,
                "read {served} bytes with only {} committed",
                self.committed_bytes
            );
            Ok(())
        }
    }

    let input: String = (0..500).map(|i| format!("line {i:03}\n")).collect();
    let served = Rc::new(RefCell::new(0));
    let reader = CountingReader {
        data: io::Cursor::new(input.into_bytes()),
        served: served.clone(),
    };
    let config = PipelineConfig::new().with_high_water_mark(7);
    let source = ReaderSource::new(reader, &config);
    let sink = CheckingSink {
        served: served.clone(),
        high_water_mark: 7,
        committed_bytes: 0,
    };

    let summary = Pipeline::new(config).unwrap().run(source, sink).unwrap();
    assert_eq!(summary.records, 500);
    assert_eq!(*served.borrow(), 500 * 9);
}
