use donutfield_common::CancellationToken;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// A single background thread fed through a task channel.
///
/// Each task travels with the cancellation token of the request that issued
/// it. Dropping the worker closes the task channel and joins the thread.
pub struct BackgroundWorker<Task, Output> {
    task_sender: Option<Sender<(Task, CancellationToken)>>,
    result_receiver: Receiver<Output>,
    thread: Option<JoinHandle<()>>,
}

impl<Task, Output> BackgroundWorker<Task, Output>
where
    Task: Send + 'static,
    Output: Send + 'static,
{
    pub fn new<F>(name: &str, worker_fn: F) -> std::io::Result<Self>
    where
        F: FnOnce(Receiver<(Task, CancellationToken)>, Sender<Output>) + Send + 'static,
    {
        let (task_sender, task_receiver) = mpsc::channel();
        let (result_sender, result_receiver) = mpsc::channel();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_fn(task_receiver, result_sender))?;

        Ok(Self {
            task_sender: Some(task_sender),
            result_receiver,
            thread: Some(thread),
        })
    }

    /// Queue a task. Returns `false` if the worker has exited.
    pub fn send_task(&self, task: Task, cancel: CancellationToken) -> bool {
        self.task_sender
            .as_ref()
            .is_some_and(|tx| tx.send((task, cancel)).is_ok())
    }

    pub fn try_recv_result(&self) -> Option<Output> {
        self.result_receiver.try_recv().ok()
    }
}

impl<Task, Output> Drop for BackgroundWorker<Task, Output> {
    fn drop(&mut self) {
        self.task_sender.take();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::warn!("background worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn next_result<T: Send + 'static>(worker: &BackgroundWorker<u32, T>) -> T {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(out) = worker.try_recv_result() {
                return out;
            }
            assert!(Instant::now() < deadline, "worker produced no result");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn doubler() -> BackgroundWorker<u32, Option<u32>> {
        BackgroundWorker::new("doubler", |tasks, results| {
            for (n, cancel) in tasks {
                let out = if cancel.is_cancelled() { None } else { Some(n * 2) };
                if results.send(out).is_err() {
                    break;
                }
            }
        })
        .unwrap()
    }

    #[test]
    fn results_arrive_in_order() {
        let worker = doubler();
        assert!(worker.send_task(1, CancellationToken::new()));
        assert!(worker.send_task(4, CancellationToken::new()));
        assert_eq!(next_result(&worker), Some(2));
        assert_eq!(next_result(&worker), Some(8));
    }

    #[test]
    fn cancelled_task_is_skipped() {
        let worker = doubler();
        let cancel = CancellationToken::new();
        cancel.cancel();
        worker.send_task(3, cancel);
        assert_eq!(next_result(&worker), None);
    }

    #[test]
    fn drop_joins_thread() {
        let worker = doubler();
        worker.send_task(1, CancellationToken::new());
        drop(worker);
    }
}
