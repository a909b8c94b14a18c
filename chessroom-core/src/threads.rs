//! Functionality related to multi-threading.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::error::{self, ErrorKind};

/// Type of function accepted as a runnable job for a Thread.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Message passed from ThreadPool to Threads to give jobs or signal termination.
enum Message {
    NewJob(Job),
    Terminate,
}

/// Long lived Thread type. Each Thread receives commands through a receiver.
#[derive(Debug)]
struct Thread {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Thread {
    /// Spawn a new worker thread named `chessroom-worker-<id>`.
    fn new(id: usize, receiver: Arc<Mutex<Receiver<Message>>>) -> error::Result<Self> {
        let runner = move || loop {
            let recv_result = {
                receiver
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .recv()
            };

            match recv_result {
                Ok(Message::NewJob(job)) => {
                    // A panicking job must not take the worker down with it.
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("worker {id}: job panicked");
                    }
                }
                Ok(Message::Terminate) => break,
                // Sender has closed, allow thread graceful exit.
                Err(_) => break,
            }
        };

        let handle = thread::Builder::new()
            .name(format!("chessroom-worker-{id}"))
            .spawn(runner)
            .map_err(|err| error::Error::new(ErrorKind::Internal, err))?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("worker {} stopped", self.id);
        }
    }
}

/// Long-lived thread pool containing n threads for job processing.
///
/// Jobs are queued on one channel and picked up by whichever thread is idle.
/// Dropping the pool discards queued jobs, then waits for running ones to finish.
#[derive(Debug)]
pub struct ThreadPool {
    threads: Vec<Thread>,
    sender: Sender<Message>,
    receiver: Arc<Mutex<Receiver<Message>>>,
}

impl ThreadPool {
    /// Create a new ThreadPool with `num_threads` persistent worker threads, at least one.
    pub fn new(num_threads: usize) -> error::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Message>();
        let receiver = Arc::new(Mutex::new(receiver));

        let threads = (0..num_threads.max(1))
            .map(|id| Thread::new(id, Arc::clone(&receiver)))
            .collect::<error::Result<Vec<_>>>()?;

        Ok(Self {
            threads,
            sender,
            receiver,
        })
    }

    /// Number of worker threads.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Send a runnable job to an available Thread in the ThreadPool to run.
    pub fn run<F>(&self, job: F) -> error::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Message::NewJob(Box::new(job)))
            .map_err(|_| (ErrorKind::Internal, "thread pool is shut down").into())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Clear all pending jobs in queue. An idle worker holds the receiver
        // while blocked on an empty queue, so there is nothing to clear then.
        if let Ok(locked_receiver) = self.receiver.try_lock() {
            while locked_receiver.try_recv().is_ok() {}
        }

        // Tell each thread to terminate.
        for _ in 0..self.threads.len() {
            let _ = self.sender.send(Message::Terminate);
        }
        // Threads join as they drop.
        self.threads.clear();
    }
}
