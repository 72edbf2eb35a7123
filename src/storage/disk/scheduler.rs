use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
    thread::{self, JoinHandle},
};

use bytes::Bytes;
use log::{debug, trace, warn};
use tokio::sync::oneshot;

use super::manager::PageStore;
use crate::{
    config::{PageId, PAGE_SIZE},
    utils::channel::Channel,
};

const WORKER_NAME: &str = "geode-disk-scheduler";

/// Destination buffer for reads. The issuer keeps a clone and looks at it once
/// the request has completed.
pub type SharedPage = Arc<Mutex<Box<[u8]>>>;

pub fn new_page_buffer() -> SharedPage {
    Arc::new(Mutex::new(vec![0u8; PAGE_SIZE].into_boxed_slice()))
}

// Outcome of a single I/O operation.
#[derive(Debug)]
pub enum IoStatus {
    Success,
    WriteError(anyhow::Error),
    ReadError(anyhow::Error),
    // The worker went away without answering
    Abandoned,
}

impl IoStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, IoStatus::Success)
    }

    pub fn into_result(self) -> anyhow::Result<()> {
        match self {
            IoStatus::Success => Ok(()),
            IoStatus::WriteError(err) => Err(err.context("disk write failed")),
            IoStatus::ReadError(err) => Err(err.context("disk read failed")),
            IoStatus::Abandoned => Err(anyhow::Error::msg(
                "disk request dropped before completion",
            )),
        }
    }
}

/// Completion handle for a scheduled request. Await it from async code or
/// call `wait` from a plain thread.
pub struct IoFuture {
    rx: oneshot::Receiver<IoStatus>,
}

impl IoFuture {
    pub fn wait(self) -> IoStatus {
        self.rx.blocking_recv().unwrap_or(IoStatus::Abandoned)
    }
}

impl Future for IoFuture {
    type Output = IoStatus;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().rx).poll(cx) {
            Poll::Ready(Ok(status)) => Poll::Ready(status),
            Poll::Ready(Err(_)) => Poll::Ready(IoStatus::Abandoned),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Creates the completion pair for a hand-built request.
pub fn create_future() -> (oneshot::Sender<IoStatus>, IoFuture) {
    let (tx, rx) = oneshot::channel();
    (tx, IoFuture { rx })
}

pub enum DiskData {
    Write(Bytes),
    Read(SharedPage),
}

// A request to perform disk I/O on one page.
pub struct DiskRequest {
    // Source bytes for writes, destination buffer for reads.
    pub data: DiskData,

    pub page_id: PageId,

    // Fulfilled exactly once by the worker.
    pub done: oneshot::Sender<IoStatus>,
}

impl DiskRequest {
    pub fn write(page_id: PageId, data: impl Into<Bytes>) -> (Self, IoFuture) {
        let (done, future) = create_future();
        let request = Self {
            data: DiskData::Write(data.into()),
            page_id,
            done,
        };
        (request, future)
    }

    pub fn read(page_id: PageId, buffer: SharedPage) -> (Self, IoFuture) {
        let (done, future) = create_future();
        let request = Self {
            data: DiskData::Read(buffer),
            page_id,
            done,
        };
        (request, future)
    }

    pub fn is_write(&self) -> bool {
        matches!(self.data, DiskData::Write(_))
    }
}

enum Message {
    Request(DiskRequest),
    Shutdown,
}

/// Serializes page reads and writes onto one background worker. Dropping the
/// scheduler drains everything already queued, then joins the worker.
pub struct DiskScheduler {
    page_store: Arc<dyn PageStore>,
    request_queue: Arc<Channel<Message>>,
    background_thread: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(page_store: Arc<dyn PageStore>) -> anyhow::Result<Self> {
        let request_queue = Arc::new(Channel::new());

        let worker_store = Arc::clone(&page_store);
        let worker_queue = Arc::clone(&request_queue);

        let background_thread = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || Self::start_worker_thread(worker_store, worker_queue))?;

        Ok(Self {
            page_store,
            request_queue,
            background_thread: Some(background_thread),
        })
    }

    pub fn page_store(&self) -> &Arc<dyn PageStore> {
        &self.page_store
    }

    /// Queues the requests in order and returns without waiting on them.
    pub fn schedule(&self, requests: impl IntoIterator<Item = DiskRequest>) {
        for request in requests {
            self.schedule_one(request);
        }
    }

    pub fn schedule_one(&self, request: DiskRequest) {
        self.request_queue.put(Message::Request(request));
    }

    /// Drains queued requests and waits for the worker to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.background_thread.take() else {
            return;
        };

        self.request_queue.put(Message::Shutdown);
        if handle.join().is_err() {
            warn!("disk scheduler worker panicked");
        }
    }

    fn start_worker_thread(page_store: Arc<dyn PageStore>, queue: Arc<Channel<Message>>) {
        debug!("disk scheduler worker started");

        loop {
            match queue.get() {
                Message::Request(request) => Self::process(page_store.as_ref(), request),
                Message::Shutdown => break,
            }
        }

        debug!("disk scheduler worker stopped");
    }

    // A failed operation is reported through the request, the worker keeps going.
    fn process(page_store: &dyn PageStore, request: DiskRequest) {
        let DiskRequest {
            data,
            page_id,
            done,
        } = request;

        let status = match data {
            DiskData::Write(bytes) => {
                trace!("writing page {}", page_id);
                match page_store.write_page(page_id, &bytes) {
                    Ok(()) => IoStatus::Success,
                    Err(err) => {
                        warn!("write of page {} failed: {:#}", page_id, err);
                        IoStatus::WriteError(err)
                    }
                }
            }
            DiskData::Read(buffer) => {
                trace!("reading page {}", page_id);
                let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                match page_store.read_page(page_id, &mut buffer) {
                    Ok(()) => IoStatus::Success,
                    Err(err) => {
                        warn!("read of page {} failed: {:#}", page_id, err);
                        IoStatus::ReadError(err)
                    }
                }
            }
        };

        // The issuer may have stopped listening.
        let _ = done.send(status);
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
