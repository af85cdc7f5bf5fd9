//! Background thread that talks to the storage backend.
//!
//! The editor never blocks on storage. The application sends
//! [`BridgeRequest`]s; a worker thread owns the backend, executes requests in
//! order and posts one [`BridgeResponse`] per request, which the application
//! polls with [`PersistenceBridge::take_one_result`].

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::backend::AnnotationBackend;
use super::error::PersistenceError;
use crate::model::{Annotation, ClassEntry, ImageEntry};

/// Work for the persistence thread.
#[derive(Debug, Clone)]
pub enum BridgeRequest {
    ListImages,
    LoadAnnotations { image: String },
    SaveAnnotations { image: String, annotations: Vec<Annotation> },
    LoadClasses,
    SaveClasses { classes: Vec<ClassEntry> },
    LoadImage { image: String },
}

impl BridgeRequest {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeRequest::ListImages => "ListImages",
            BridgeRequest::LoadAnnotations { .. } => "LoadAnnotations",
            BridgeRequest::SaveAnnotations { .. } => "SaveAnnotations",
            BridgeRequest::LoadClasses => "LoadClasses",
            BridgeRequest::SaveClasses { .. } => "SaveClasses",
            BridgeRequest::LoadImage { .. } => "LoadImage",
        }
    }
}

/// Outcome of one request, in request order.
#[derive(Debug)]
pub enum BridgeResponse {
    Images(Result<Vec<ImageEntry>, PersistenceError>),
    Annotations {
        image: String,
        result: Result<Vec<Annotation>, PersistenceError>,
    },
    AnnotationsSaved {
        image: String,
        result: Result<(), PersistenceError>,
    },
    Classes(Result<Vec<ClassEntry>, PersistenceError>),
    ClassesSaved(Result<(), PersistenceError>),
    Image {
        image: String,
        result: Result<Vec<u8>, PersistenceError>,
    },
}

/// Message sent to the persistence thread.
enum ThreadMessage {
    /// Run a request
    Request(BridgeRequest),
    /// Shutdown the thread
    Shutdown,
}

/// Owns the persistence worker and its channels.
pub struct PersistenceBridge {
    /// Sender for requests to the background thread
    request_tx: Sender<ThreadMessage>,
    /// Receiver for results from the background thread
    result_rx: Receiver<BridgeResponse>,
    /// Handle to the background thread (for joining on drop)
    thread_handle: Option<JoinHandle<()>>,
    /// Requests sent but not yet answered
    pending: usize,
}

impl PersistenceBridge {
    /// Spawn the worker thread, moving the backend onto it.
    pub fn spawn<B: AnnotationBackend + 'static>(backend: B) -> Result<Self, PersistenceError> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (result_tx, result_rx) = mpsc::channel::<BridgeResponse>();

        let thread_handle = thread::Builder::new()
            .name("persistence".to_string())
            .spawn(move || {
                log::info!("Persistence thread started");
                Self::thread_loop(backend, request_rx, result_tx);
                log::info!("Persistence thread exiting");
            })?;

        Ok(Self {
            request_tx,
            result_rx,
            thread_handle: Some(thread_handle),
            pending: 0,
        })
    }

    /// Background thread main loop.
    fn thread_loop<B: AnnotationBackend>(
        mut backend: B,
        request_rx: Receiver<ThreadMessage>,
        result_tx: Sender<BridgeResponse>,
    ) {
        loop {
            match request_rx.recv() {
                Ok(ThreadMessage::Request(request)) => {
                    log::trace!("Persistence request: {}", request.name());
                    let response = Self::execute(&mut backend, request);
                    if result_tx.send(response).is_err() {
                        log::warn!("Result channel closed, persistence thread exiting");
                        break;
                    }
                }
                Ok(ThreadMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, persistence thread exiting");
                    break;
                }
            }
        }
    }

    fn execute<B: AnnotationBackend>(backend: &mut B, request: BridgeRequest) -> BridgeResponse {
        let response = match request {
            BridgeRequest::ListImages => BridgeResponse::Images(backend.list_images()),
            BridgeRequest::LoadAnnotations { image } => {
                let result = backend.load_annotations(&image);
                BridgeResponse::Annotations { image, result }
            }
            BridgeRequest::SaveAnnotations { image, annotations } => {
                let result = backend.save_annotations(&image, &annotations);
                BridgeResponse::AnnotationsSaved { image, result }
            }
            BridgeRequest::LoadClasses => BridgeResponse::Classes(backend.load_classes()),
            BridgeRequest::SaveClasses { classes } => {
                BridgeResponse::ClassesSaved(backend.save_classes(&classes))
            }
            BridgeRequest::LoadImage { image } => {
                let result = backend.load_image(&image);
                BridgeResponse::Image { image, result }
            }
        };
        if let Some(e) = response.error() {
            log::error!("Persistence operation failed: {}", e);
        }
        response
    }

    /// Queue a request. Fails only if the worker is gone.
    pub fn send(&mut self, request: BridgeRequest) -> Result<(), PersistenceError> {
        let name = request.name();
        self.request_tx
            .send(ThreadMessage::Request(request))
            .map_err(|_| PersistenceError::Disconnected)?;
        self.pending += 1;
        log::debug!("Sent {} ({} pending)", name, self.pending);
        Ok(())
    }

    /// Take one completed result from the queue.
    ///
    /// Returns the oldest result, or None if no results are available.
    /// Non-blocking.
    pub fn take_one_result(&mut self) -> Option<BridgeResponse> {
        match self.result_rx.try_recv() {
            Ok(response) => {
                self.pending = self.pending.saturating_sub(1);
                Some(response)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Persistence thread disconnected");
                None
            }
        }
    }

    /// Block for the next result, up to `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<BridgeResponse> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(response) => {
                self.pending = self.pending.saturating_sub(1);
                Some(response)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Persistence thread disconnected");
                None
            }
        }
    }

    /// Get the number of requests still in flight.
    pub fn pending(&self) -> usize {
        self.pending
    }
}

impl BridgeResponse {
    /// Error carried by the response, if the operation failed.
    pub fn error(&self) -> Option<&PersistenceError> {
        match self {
            BridgeResponse::Images(r) => r.as_ref().err(),
            BridgeResponse::Annotations { result, .. } => result.as_ref().err(),
            BridgeResponse::AnnotationsSaved { result, .. } => result.as_ref().err(),
            BridgeResponse::Classes(r) => r.as_ref().err(),
            BridgeResponse::ClassesSaved(r) => r.as_ref().err(),
            BridgeResponse::Image { result, .. } => result.as_ref().err(),
        }
    }
}

impl Drop for PersistenceBridge {
    fn drop(&mut self) {
        log::debug!("Shutting down persistence thread");

        // Requests already queued are still executed before the shutdown message
        let _ = self.request_tx.send(ThreadMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Persistence thread panicked: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;
    use crate::persistence::backend::{FailureFlags, MemoryBackend};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn rect(id: u64) -> Annotation {
        Annotation::rectangle(id, "person", Point::new(0.0, 0.0), Point::new(10.0, 10.0))
    }

    #[test]
    fn test_save_then_load_in_order() {
        let mut bridge = PersistenceBridge::spawn(MemoryBackend::new()).unwrap();
        let anns = vec![rect(1), rect(2)];
        bridge
            .send(BridgeRequest::SaveAnnotations {
                image: "a.png".to_string(),
                annotations: anns.clone(),
            })
            .unwrap();
        bridge
            .send(BridgeRequest::LoadAnnotations {
                image: "a.png".to_string(),
            })
            .unwrap();
        assert_eq!(bridge.pending(), 2);

        match bridge.recv_timeout(TIMEOUT) {
            Some(BridgeResponse::AnnotationsSaved { image, result }) => {
                assert_eq!(image, "a.png");
                assert!(result.is_ok());
            }
            other => panic!("unexpected response {:?}", other),
        }
        match bridge.recv_timeout(TIMEOUT) {
            Some(BridgeResponse::Annotations { result: Ok(loaded), .. }) => assert_eq!(loaded, anns),
            other => panic!("unexpected response {:?}", other),
        }
        assert_eq!(bridge.pending(), 0);
        assert!(bridge.take_one_result().is_none());
    }

    #[test]
    fn test_failures_are_reported_not_fatal() {
        let backend = MemoryBackend::new().with_failures(FailureFlags::all());
        let mut bridge = PersistenceBridge::spawn(backend).unwrap();
        bridge.send(BridgeRequest::LoadClasses).unwrap();
        bridge.send(BridgeRequest::ListImages).unwrap();

        let first = bridge.recv_timeout(TIMEOUT).unwrap();
        assert!(matches!(first, BridgeResponse::Classes(Err(PersistenceError::Injected(_)))));
        let second = bridge.recv_timeout(TIMEOUT).unwrap();
        assert!(second.error().is_some());
    }

    #[test]
    fn test_drop_joins_worker() {
        let mut bridge = PersistenceBridge::spawn(MemoryBackend::new()).unwrap();
        bridge.send(BridgeRequest::ListImages).unwrap();
        drop(bridge);
    }
}
