#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracker_core::{Batch, BatchSnapshot, BatchStatus, Channel, ControlAction, Job, JobStatus};
use tracker_engine::{ApiError, ConnectionSettings, Connector, Link, SnapshotApi, TransportError};

pub fn init_logging() {
    tracker_logging::initialize_for_tests();
}

pub fn settings() -> ConnectionSettings {
    ConnectionSettings {
        endpoint: "ws://tracker.test/api/ws".to_string(),
        bearer_token: None,
        connect_timeout: Duration::from_secs(10),
        keepalive_interval: Duration::from_secs(30),
        reconnect_delay: Duration::from_secs(3),
        max_reconnect_attempts: 5,
    }
}

/// Server end of one accepted fake link.
pub struct FakeServer {
    pub to_client: mpsc::UnboundedSender<String>,
    pub from_client: mpsc::UnboundedReceiver<String>,
}

impl FakeServer {
    pub fn push(&self, raw: &str) {
        self.to_client.send(raw.to_string()).unwrap();
    }
}

struct FakeLink {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait::async_trait]
impl Link for FakeLink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }
}

/// In-memory connector. Each accepted connect hands its server end to the
/// test through the receiver returned by [`FakeConnector::new`].
pub struct FakeConnector {
    refuse: AtomicBool,
    attempts: AtomicUsize,
    handshakes: Mutex<Vec<Vec<Channel>>>,
    servers: mpsc::UnboundedSender<FakeServer>,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeServer>) {
        let (servers, servers_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            refuse: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            handshakes: Mutex::new(Vec::new()),
            servers,
        });
        (connector, servers_rx)
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn handshakes(&self) -> Vec<Vec<Channel>> {
        self.handshakes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, channels: &[Channel]) -> Result<Box<dyn Link>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        self.handshakes.lock().unwrap().push(channels.to_vec());

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let _ = self.servers.send(FakeServer {
            to_client,
            from_client,
        });
        Ok(Box::new(FakeLink { inbound, outbound }))
    }
}

/// Snapshot API answering from a shared snapshot and recording control calls.
#[derive(Default)]
pub struct FakeApi {
    pub snapshot: Mutex<Option<BatchSnapshot>>,
    pub fetches: AtomicUsize,
    pub controls: Mutex<Vec<(String, ControlAction)>>,
    pub control_error: Mutex<Option<ApiError>>,
}

impl FakeApi {
    pub fn with_snapshot(snapshot: BatchSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Self::default()
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn controls(&self) -> Vec<(String, ControlAction)> {
        self.controls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SnapshotApi for FakeApi {
    async fn get_batch(&self, batch_id: &str) -> Result<BatchSnapshot, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.snapshot.lock().unwrap().clone() {
            Some(snapshot) if snapshot.id() == batch_id => Ok(snapshot),
            _ => Err(ApiError::Status {
                code: 404,
                detail: "Batch not found".to_string(),
            }),
        }
    }

    async fn control(&self, batch_id: &str, action: ControlAction) -> Result<(), ApiError> {
        self.controls
            .lock()
            .unwrap()
            .push((batch_id.to_string(), action));
        match self.control_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn snapshot(batch_id: &str, statuses: &[JobStatus]) -> BatchSnapshot {
    let total = u32::try_from(statuses.len()).unwrap();
    let batch = Batch::new(batch_id, BatchStatus::Running, total);
    let jobs = statuses
        .iter()
        .enumerate()
        .map(|(index, status)| {
            let mut job = Job::new(format!("job{}", index + 1), batch_id, *status);
            job.episode_id = format!("ep{}", index + 1);
            job
        })
        .collect();
    BatchSnapshot::new(batch, jobs)
}
