use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

use crate::error::WorkerError;

type Outcome<O> = (u64, Result<O, String>);

// ---------------------------------------------------------------------------
// Worker – off-thread computation with a last-known-good value
// ---------------------------------------------------------------------------

/// Runs one pure computation per request on a background thread.
///
/// The owner never blocks: [`Worker::value`] returns the default until the
/// first result arrives, then the newest completed result. Requests carry a
/// caller-chosen key (a snapshot revision); a request with the key of the
/// previous one is skipped. Results older than the newest applied one are
/// dropped, and a failed computation keeps the previous value.
pub struct Worker<I, O> {
    task: String,
    compute: fn(&I) -> O,
    latest: O,
    last_key: Option<u64>,
    generation: u64,
    applied: u64,
    sender: mpsc::Sender<Outcome<O>>,
    receiver: mpsc::Receiver<Outcome<O>>,
}

impl<I, O> Worker<I, O>
where
    I: Send + 'static,
    O: Clone + Default + Send + 'static,
{
    pub fn new(task: impl Into<String>, compute: fn(&I) -> O) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            task: task.into(),
            compute,
            latest: O::default(),
            last_key: None,
            generation: 0,
            applied: 0,
            sender,
            receiver,
        }
    }

    /// Start computing `input` unless `key` matches the previous request.
    /// Returns whether a computation was started.
    pub fn request(&mut self, key: u64, input: I) -> bool {
        if self.last_key == Some(key) {
            return false;
        }
        self.last_key = Some(key);
        self.generation += 1;
        let generation = self.generation;
        let compute = self.compute;
        let sender = self.sender.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-{generation}", self.task))
            .spawn(move || {
                let result = run_guarded(compute, &input);
                // The owner may be gone; nothing left to deliver to.
                let _ = sender.send((generation, result));
            });

        if let Err(e) = spawned {
            log::error!("Could not spawn worker thread for {}: {e}", self.task);
            let _ = self.sender.send((
                generation,
                Err(format!("thread spawn failed: {e}")),
            ));
        }
        true
    }

    /// Apply every finished result without blocking.
    ///
    /// Returns `Ok(true)` when the value changed. A failed computation leaves
    /// the previous value in place and is reported as an error.
    pub fn poll(&mut self) -> Result<bool, WorkerError> {
        let mut changed = false;
        let mut failure = None;
        while let Ok(outcome) = self.receiver.try_recv() {
            match self.apply(outcome) {
                Ok(c) => changed |= c,
                Err(e) => failure = Some(e),
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(changed),
        }
    }

    /// Block until the newest request has completed.
    pub fn wait(&mut self) -> Result<&O, WorkerError> {
        let mut failure = None;
        while self.is_pending() {
            let Ok(outcome) = self.receiver.recv() else {
                break;
            };
            // Only a newer generation can change the verdict.
            match self.apply(outcome) {
                Ok(true) => failure = None,
                Ok(false) => {}
                Err(e) => failure = Some(e),
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(&self.latest),
        }
    }

    fn apply(&mut self, (generation, result): Outcome<O>) -> Result<bool, WorkerError> {
        if generation <= self.applied {
            log::debug!("{}: dropping stale result #{generation}", self.task);
            return Ok(false);
        }
        self.applied = generation;
        match result {
            Ok(value) => {
                self.latest = value;
                Ok(true)
            }
            Err(message) => {
                log::warn!("{} failed, keeping previous result: {message}", self.task);
                Err(WorkerError {
                    task: self.task.clone(),
                    message,
                })
            }
        }
    }

    pub fn value(&self) -> &O {
        &self.latest
    }

    /// Whether a newer request than the current value is still running.
    pub fn is_pending(&self) -> bool {
        self.applied < self.generation
    }

    /// Forget the memo key and value, e.g. after the input tables changed.
    pub fn reset(&mut self) {
        self.last_key = None;
        self.latest = O::default();
        self.applied = self.generation;
    }
}

fn run_guarded<I, O>(compute: fn(&I) -> O, input: &I) -> Result<O, String> {
    panic::catch_unwind(AssertUnwindSafe(|| compute(input))).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "computation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(values: &Vec<u64>) -> u64 {
        values.iter().sum()
    }

    fn explode(values: &Vec<u64>) -> u64 {
        if values.is_empty() {
            panic!("no values");
        }
        values[0]
    }

    #[test]
    fn default_until_result_arrives() {
        let mut worker = Worker::new("sum", sum);
        assert_eq!(*worker.value(), 0);
        assert!(worker.request(1, vec![1, 2, 3]));
        assert_eq!(*worker.wait().unwrap(), 6);
        assert!(!worker.is_pending());
    }

    #[test]
    fn same_key_is_not_recomputed() {
        let mut worker = Worker::new("sum", sum);
        assert!(worker.request(7, vec![1]));
        assert!(!worker.request(7, vec![100]));
        assert_eq!(*worker.wait().unwrap(), 1);
    }

    #[test]
    fn newest_request_wins() {
        let mut worker = Worker::new("sum", sum);
        worker.request(1, vec![1]);
        worker.request(2, vec![2, 2]);
        assert_eq!(*worker.wait().unwrap(), 4);
        // Any late result of the first request is stale by now.
        assert!(!worker.poll().unwrap());
        assert_eq!(*worker.value(), 4);
    }

    #[test]
    fn failure_keeps_previous_value() {
        let mut worker = Worker::new("first", explode);
        worker.request(1, vec![5]);
        assert_eq!(*worker.wait().unwrap(), 5);

        worker.request(2, Vec::new());
        let err = worker.wait().unwrap_err();
        assert_eq!(err.task, "first");
        assert!(err.message.contains("no values"));
        assert_eq!(*worker.value(), 5);
    }
}
