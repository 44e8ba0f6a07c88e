use crate::entities::player::PlayerId;
use crate::persistence::store::{HomeBackend, HomeRecord};
use crate::telemetry::logging;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum StorageJob {
    Query {
        player: PlayerId,
        generation: u64,
        user_id: u32,
    },
    Insert {
        user_id: u32,
        record: HomeRecord,
    },
    Delete {
        user_id: u32,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageEvent {
    Loaded {
        player: PlayerId,
        generation: u64,
        user_id: u32,
        result: Result<Vec<HomeRecord>, String>,
    },
    WriteFailed {
        user_id: u32,
        detail: String,
    },
}

/// Non-blocking handle to durable home storage.
///
/// Writes are fire-and-forget; query results and write failures come back
/// through `drain` on a later tick.
pub trait HomeStorage {
    fn submit(&mut self, job: StorageJob);
    fn drain(&mut self) -> Vec<StorageEvent>;
}

impl<T: HomeStorage + ?Sized> HomeStorage for Box<T> {
    fn submit(&mut self, job: StorageJob) {
        (**self).submit(job);
    }

    fn drain(&mut self) -> Vec<StorageEvent> {
        (**self).drain()
    }
}

fn run_job<B: HomeBackend>(backend: &mut B, job: StorageJob) -> Option<StorageEvent> {
    match job {
        StorageJob::Query {
            player,
            generation,
            user_id,
        } => Some(StorageEvent::Loaded {
            player,
            generation,
            user_id,
            result: backend.query(user_id),
        }),
        StorageJob::Insert { user_id, record } => backend
            .insert(user_id, &record)
            .err()
            .map(|detail| write_failed(user_id, detail)),
        StorageJob::Delete { user_id, name } => backend
            .delete(user_id, &name)
            .err()
            .map(|detail| write_failed(user_id, detail)),
    }
}

fn write_failed(user_id: u32, detail: String) -> StorageEvent {
    logging::log_error(&format!("home write failed for user {}: {}", user_id, detail));
    StorageEvent::WriteFailed { user_id, detail }
}

/// Runs the backend on the caller's thread; events are still delivered on `drain`.
#[derive(Debug, Default)]
pub struct InlineStorage<B> {
    backend: B,
    events: VecDeque<StorageEvent>,
    held: VecDeque<StorageJob>,
    hold: bool,
}

impl<B: HomeBackend> InlineStorage<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            events: VecDeque::new(),
            held: VecDeque::new(),
            hold: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Queue jobs instead of running them until `release` is called.
    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    pub fn held_jobs(&self) -> usize {
        self.held.len()
    }

    pub fn release(&mut self) {
        while let Some(job) = self.held.pop_front() {
            if let Some(event) = run_job(&mut self.backend, job) {
                self.events.push_back(event);
            }
        }
    }
}

impl<B: HomeBackend> HomeStorage for InlineStorage<B> {
    fn submit(&mut self, job: StorageJob) {
        if self.hold {
            self.held.push_back(job);
            return;
        }
        if let Some(event) = run_job(&mut self.backend, job) {
            self.events.push_back(event);
        }
    }

    fn drain(&mut self) -> Vec<StorageEvent> {
        self.events.drain(..).collect()
    }
}

enum WorkerMessage {
    Job(StorageJob),
    Shutdown,
}

/// Runs the backend on a dedicated worker thread.
pub struct ThreadedStorage {
    jobs: Sender<WorkerMessage>,
    events: Receiver<StorageEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadedStorage {
    pub fn spawn<B: HomeBackend>(mut backend: B) -> Result<Self, String> {
        let (job_tx, job_rx) = mpsc::channel::<WorkerMessage>();
        let (event_tx, event_rx) = mpsc::channel::<StorageEvent>();
        let handle = std::thread::Builder::new()
            .name("home-storage".to_string())
            .spawn(move || {
                while let Ok(WorkerMessage::Job(job)) = job_rx.recv() {
                    if let Some(event) = run_job(&mut backend, job) {
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                }
            })
            .map_err(|err| format!("home storage worker spawn failed: {}", err))?;
        Ok(Self {
            jobs: job_tx,
            events: event_rx,
            handle: Some(handle),
        })
    }

    /// Block up to `timeout` for the next completion.
    pub fn wait_event(&self, timeout: Duration) -> Option<StorageEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl HomeStorage for ThreadedStorage {
    fn submit(&mut self, job: StorageJob) {
        if self.jobs.send(WorkerMessage::Job(job)).is_err() {
            logging::log_error("home storage worker is gone, job dropped");
            eprintln!("homes: home storage worker is gone, job dropped");
        }
    }

    fn drain(&mut self) -> Vec<StorageEvent> {
        self.events.try_iter().collect()
    }
}

impl Drop for ThreadedStorage {
    /// Pending writes are flushed before the worker exits.
    fn drop(&mut self) {
        let _ = self.jobs.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                eprintln!("homes: home storage worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::MemoryHomeBackend;
    use crate::world::position::Position;

    #[test]
    fn inline_query_is_delivered_on_drain() {
        let backend =
            MemoryHomeBackend::with_rows(9, vec![HomeRecord::new("base", Position::ORIGIN)]);
        let mut storage = InlineStorage::new(backend);
        storage.submit(StorageJob::Query {
            player: PlayerId(1),
            generation: 3,
            user_id: 9,
        });
        let events = storage.drain();
        assert_eq!(
            events,
            vec![StorageEvent::Loaded {
                player: PlayerId(1),
                generation: 3,
                user_id: 9,
                result: Ok(vec![HomeRecord::new("base", Position::ORIGIN)]),
            }]
        );
        assert!(storage.drain().is_empty());
    }

    #[test]
    fn inline_successful_writes_emit_nothing() {
        let mut storage = InlineStorage::new(MemoryHomeBackend::new());
        storage.submit(StorageJob::Insert {
            user_id: 1,
            record: HomeRecord::new("a", Position::ORIGIN),
        });
        storage.submit(StorageJob::Delete {
            user_id: 1,
            name: "a".to_string(),
        });
        assert!(storage.drain().is_empty());
        assert!(storage.backend().rows(1).is_empty());
    }

    #[test]
    fn inline_write_failure_is_reported_out_of_band() {
        let mut backend = MemoryHomeBackend::new();
        backend.set_fail_writes(true);
        let mut storage = InlineStorage::new(backend);
        storage.submit(StorageJob::Insert {
            user_id: 4,
            record: HomeRecord::new("a", Position::ORIGIN),
        });
        let events = storage.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StorageEvent::WriteFailed { user_id: 4, .. }
        ));
    }

    #[test]
    fn inline_hold_defers_jobs_until_release() {
        let mut storage = InlineStorage::new(MemoryHomeBackend::new());
        storage.set_hold(true);
        storage.submit(StorageJob::Insert {
            user_id: 2,
            record: HomeRecord::new("a", Position::ORIGIN),
        });
        assert_eq!(storage.held_jobs(), 1);
        assert!(storage.backend().rows(2).is_empty());
        storage.release();
        assert_eq!(storage.held_jobs(), 0);
        assert_eq!(storage.backend().rows(2).len(), 1);
    }

    #[test]
    fn threaded_worker_answers_queries_in_order() {
        let mut storage = ThreadedStorage::spawn(MemoryHomeBackend::new()).unwrap();
        storage.submit(StorageJob::Insert {
            user_id: 5,
            record: HomeRecord::new("first", Position::new(1.0, 1.0, 1.0)),
        });
        storage.submit(StorageJob::Insert {
            user_id: 5,
            record: HomeRecord::new("second", Position::new(2.0, 2.0, 2.0)),
        });
        storage.submit(StorageJob::Query {
            player: PlayerId(11),
            generation: 1,
            user_id: 5,
        });
        let event = storage
            .wait_event(Duration::from_secs(5))
            .expect("query result");
        match event {
            StorageEvent::Loaded {
                player,
                result: Ok(rows),
                ..
            } => {
                assert_eq!(player, PlayerId(11));
                let names: Vec<&str> = rows.iter().map(|row| row.name.as_str()).collect();
                assert_eq!(names, vec!["first", "second"]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
