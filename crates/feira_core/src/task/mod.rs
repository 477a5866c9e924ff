use std::{
    result::Result,
    sync::{
        atomic::{AtomicI32, Ordering},
        mpsc::{Receiver, SendError, Sender, TryRecvError},
        Arc,
    },
    thread::JoinHandle,
};

/// A single worker thread fed through a channel.
/// Results come back in submission order on a second channel that the UI polls once per frame.
/// There is no cancellation: a task that was sent always runs to completion.
pub struct AsyncTaskGuard<TaskItem, ResultItem> {
    task_sender: Sender<TaskItem>,
    result_receiver: Receiver<ResultItem>,
    _thread_task: JoinHandle<()>,
    nb: Arc<AtomicI32>,
}

impl<TaskItem, ResultItem> AsyncTaskGuard<TaskItem, ResultItem>
where
    TaskItem: Send + 'static,
    ResultItem: Send + 'static,
{
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(TaskItem) -> ResultItem + Send + 'static,
    {
        //https://doc.rust-lang.org/rust-by-example/std_misc/channels.html
        let (task_sender, th_task_receiver) = std::sync::mpsc::channel::<TaskItem>();
        let (th_result_sender, result_receiver) = std::sync::mpsc::channel();
        let nb = Arc::new(AtomicI32::new(0));
        let th_nb = Arc::clone(&nb);
        let thread_task = std::thread::spawn(move || {
            while let Ok(elt) = th_task_receiver.recv() {
                // the task stops counting before its result is visible, even if `f` panics
                let result = {
                    let _guard = scopeguard::guard(Arc::clone(&th_nb), |nb| {
                        nb.fetch_sub(1, Ordering::AcqRel);
                    });
                    f(elt)
                };
                if th_result_sender.send(result).is_err() {
                    tracing::debug!("task result dropped, receiver is gone");
                    break;
                }
            }
        });
        Self {
            task_sender,
            result_receiver,
            _thread_task: thread_task,
            nb,
        }
    }
    pub fn send(&self, value: TaskItem) -> Result<(), SendError<TaskItem>> {
        // counted on send so that a task waiting in the queue is already "running" for the UI
        self.nb.fetch_add(1, Ordering::AcqRel);
        self.task_sender.send(value).inspect_err(|_| {
            self.nb.fetch_sub(1, Ordering::AcqRel);
        })
    }
    pub fn try_recv(&self) -> Option<ResultItem> {
        match self.result_receiver.try_recv() {
            Ok(r) => Some(r),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::error!("task thread is gone");
                None
            }
        }
    }

    pub fn count(&self) -> i32 {
        self.nb.load(Ordering::Acquire)
    }
    pub fn is_running(&self) -> bool {
        self.count() != 0
    }
}
