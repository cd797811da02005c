//! Single-worker FIFO task queue.
//!
//! A [`SerialExecutor`] owns one dedicated OS thread and the state `S` that
//! thread mutates. Tasks are closures over `&mut S`; they run one at a time in
//! submission order, so the state needs no lock. The state is built by the
//! initializer passed to [`SerialExecutor::spawn`], which is the first thing
//! the worker runs: tasks submitted before it finishes wait in the queue.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

type Task<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Cloneable handle to a serial worker.
///
/// The worker exits once every handle is dropped and the queue is drained.
pub struct SerialExecutor<S> {
    name: Arc<str>,
    task_tx: mpsc::UnboundedSender<Task<S>>,
}

impl<S> Clone for SerialExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            task_tx: self.task_tx.clone(),
        }
    }
}

impl<S: 'static> SerialExecutor<S> {
    /// Start the worker thread.
    ///
    /// `init` runs on the worker before any submitted task.
    pub fn spawn<F>(name: impl Into<String>, init: F) -> io::Result<Self>
    where
        F: FnOnce() -> S + Send + 'static,
    {
        let name: Arc<str> = Arc::from(name.into());
        let (task_tx, task_rx) = mpsc::unbounded_channel::<Task<S>>();

        let worker_name = Arc::clone(&name);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(worker_name, init, task_rx))?;

        Ok(Self { name, task_tx })
    }

    /// Enqueue `task` and return immediately.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.task_tx.send(Box::new(task)).is_err() {
            warn!("Executor {} has stopped; dropping task", self.name);
        }
    }

    /// Wait until every task submitted before this call has run.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(move |_| {
            let _ = done_tx.send(());
        });
        if done_rx.await.is_err() {
            debug!("Executor {} stopped before flush completed", self.name);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn run_worker<S, F>(name: Arc<str>, init: F, mut task_rx: mpsc::UnboundedReceiver<Task<S>>)
where
    F: FnOnce() -> S,
{
    let mut state = match panic::catch_unwind(AssertUnwindSafe(init)) {
        Ok(state) => state,
        Err(payload) => {
            error!(
                "Executor {} failed to initialize: {}",
                name,
                panic_message(&*payload)
            );
            return;
        }
    };
    debug!("Executor {} ready", name);

    while let Some(task) = task_rx.blocking_recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task(&mut state))) {
            error!("Task on executor {} panicked: {}", name, panic_message(&*payload));
        }
    }

    debug!("Executor {} stopped", name);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Panics if called from inside an async runtime context.
///
/// Store state transitions do blocking file I/O and must only run on an
/// executor worker (or a plain thread in tests), never on the thread that
/// consumes broadcasts.
pub fn assert_blocking_context(operation: &str) {
    if tokio::runtime::Handle::try_current().is_ok() {
        panic!("{operation} called from an async runtime thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_tasks_run_in_submission_order() {
        let executor = SerialExecutor::spawn("order", Vec::<u32>::new).unwrap();
        for i in 0..100 {
            executor.submit(move |log| log.push(i));
        }

        let (tx, rx) = oneshot::channel();
        executor.submit(move |log| {
            let _ = tx.send(log.clone());
        });
        let log = rx.await.unwrap();

        assert_eq!(log, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_queue() {
        let executor = SerialExecutor::spawn("panics", || 0u32).unwrap();
        executor.submit(|count| *count += 1);
        executor.submit(|_| panic!("boom"));
        executor.submit(|count| *count += 1);

        let (tx, rx) = oneshot::channel();
        executor.submit(move |count| {
            let _ = tx.send(*count);
        });

        assert_eq!(rx.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_submit_before_slow_init_is_buffered() {
        let executor = SerialExecutor::spawn("slow-init", || {
            thread::sleep(Duration::from_millis(50));
            vec!["init"]
        })
        .unwrap();
        executor.submit(|log| log.push("task"));

        let (tx, rx) = oneshot::channel();
        executor.submit(move |log| {
            let _ = tx.send(log.clone());
        });

        assert_eq!(rx.await.unwrap(), vec!["init", "task"]);
    }

    #[tokio::test]
    async fn test_reentrant_submit_enqueues() {
        let executor = SerialExecutor::spawn("reentrant", Vec::<&str>::new).unwrap();
        let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();
        executor.submit(move |_| {
            let _ = gate_rx.recv();
        });

        let inner = executor.clone();
        executor.submit(move |log| {
            inner.submit(|log| log.push("inner"));
            log.push("outer");
        });
        executor.submit(|log| log.push("next"));
        gate_tx.send(()).unwrap();
        executor.flush().await;
        executor.flush().await;

        let (tx, rx) = oneshot::channel();
        executor.submit(move |log| {
            let _ = tx.send(log.clone());
        });

        assert_eq!(rx.await.unwrap(), vec!["outer", "next", "inner"]);
    }

    #[tokio::test]
    async fn test_flush_waits_for_earlier_tasks() {
        let seen = Arc::new(Mutex::new(false));
        let executor = SerialExecutor::spawn("flush", || ()).unwrap();

        let flag = Arc::clone(&seen);
        executor.submit(move |_| {
            thread::sleep(Duration::from_millis(20));
            *flag.lock().unwrap() = true;
        });
        executor.flush().await;

        assert!(*seen.lock().unwrap());
    }

    #[test]
    fn test_worker_is_a_blocking_context() {
        let executor = SerialExecutor::spawn("blocking", || ()).unwrap();
        assert_eq!(executor.name(), "blocking");
        let (tx, rx) = std::sync::mpsc::channel();
        executor.submit(move |_| {
            assert_blocking_context("test");
            let _ = tx.send(thread::current().name().map(str::to_string));
        });

        assert_eq!(rx.recv().unwrap().as_deref(), Some("blocking"));
    }

    #[tokio::test]
    #[should_panic(expected = "called from an async runtime thread")]
    async fn test_async_context_is_rejected() {
        assert_blocking_context("manifest refresh");
    }
}
