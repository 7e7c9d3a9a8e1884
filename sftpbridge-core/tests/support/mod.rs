//! In-memory object store, remote tree and retry queue for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sftpbridge_core::config::{RedeliveryPolicy, RemoteConnectionConfig, StreamConfigs};
use sftpbridge_core::config_source::StaticConfigSource;
use sftpbridge_core::path::to_segments;
use sftpbridge_core::ports::{ObjectStore, RemoteConnector, RemoteSession, RetryQueue};
use sftpbridge_core::{
    BridgeConfig, BridgeError, BridgeResult, InvocationContext, InvocationRouter, QueueMessage,
    RemoteEntry, StoredObject,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Fixed reference time for retention tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
}

pub fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - chrono::Duration::days(days)
}

pub fn test_context() -> InvocationContext {
    InvocationContext::new("test", "us-east-1", "1234567890")
}

pub fn streams(json: serde_json::Value) -> StreamConfigs {
    serde_json::from_value(json).expect("stream config must parse")
}

fn normalize(path: &str) -> String {
    to_segments(path).join("/")
}

#[derive(Clone, Copy, Debug)]
pub enum Fault {
    Remote,
    Timeout,
}

impl Fault {
    fn error(self, what: &str) -> BridgeError {
        match self {
            Fault::Remote => BridgeError::Remote(format!("injected failure: {what}")),
            Fault::Timeout => BridgeError::Timeout(format!("injected timeout: {what}")),
        }
    }
}

// ── Object store ────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<String, StoredObject>,
    failing: HashSet<(&'static str, String)>,
    metadata_replacements: usize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, body: &str) {
        self.put_with_metadata(path, body, HashMap::new());
    }

    pub fn put_with_metadata(&self, path: &str, body: &str, metadata: HashMap<String, String>) {
        self.state.lock().unwrap().objects.insert(
            normalize(path),
            StoredObject {
                body: body.as_bytes().to_vec(),
                metadata,
            },
        );
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.state.lock().unwrap().objects.get(&normalize(path)).cloned()
    }

    pub fn body(&self, path: &str) -> Option<String> {
        self.get(path)
            .map(|o| String::from_utf8(o.body).expect("utf-8 body"))
    }

    pub fn metadata(&self, path: &str) -> Option<HashMap<String, String>> {
        self.get(path).map(|o| o.metadata)
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn metadata_replacements(&self) -> usize {
        self.state.lock().unwrap().metadata_replacements
    }

    /// Makes `op` (`get`, `put`, `replace`) fail for `path`.
    pub fn fail(&self, op: &'static str, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert((op, normalize(path)));
    }

    fn check(&self, op: &'static str, path: &str) -> BridgeResult<()> {
        if self.state.lock().unwrap().failing.contains(&(op, path.to_string())) {
            return Err(BridgeError::Store(format!("injected {op} failure: {path}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> BridgeResult<StoredObject> {
        let path = normalize(&format!("{bucket}/{key}"));
        self.check("get", &path)?;
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&path)
            .cloned()
            .ok_or_else(|| BridgeError::Store(format!("NoSuchKey: {path}")))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> BridgeResult<()> {
        let path = normalize(&format!("{bucket}/{key}"));
        self.check("put", &path)?;
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(path, StoredObject { body, metadata });
        Ok(())
    }

    async fn replace_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> BridgeResult<()> {
        let path = normalize(&format!("{bucket}/{key}"));
        self.check("replace", &path)?;
        let mut state = self.state.lock().unwrap();
        let object = state
            .objects
            .get_mut(&path)
            .ok_or_else(|| BridgeError::Store(format!("NoSuchKey: {path}")))?;
        object.metadata = metadata;
        state.metadata_replacements += 1;
        Ok(())
    }
}

// ── Remote tree ─────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct RemoteFile {
    pub body: Vec<u8>,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct RemoteState {
    files: BTreeMap<String, RemoteFile>,
    faults: HashMap<(&'static str, String), Fault>,
    connect_fault: Option<Fault>,
    host_faults: HashMap<String, Fault>,
    transfer_delay: Option<Duration>,
    listed: Vec<String>,
    connected: Vec<RemoteConnectionConfig>,
    opened: usize,
    closed: usize,
    writes: usize,
}

/// A remote file tree shared by every session it hands out.
///
/// Directories exist implicitly as ancestors of files.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, body: &str) {
        self.put_modified(path, body, Some(Utc::now()));
    }

    pub fn put_modified(&self, path: &str, body: &str, modified: Option<DateTime<Utc>>) {
        self.state.lock().unwrap().files.insert(
            normalize(path),
            RemoteFile {
                body: body.as_bytes().to_vec(),
                modified,
            },
        );
    }

    pub fn body(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(&normalize(path))
            .map(|f| String::from_utf8(f.body.clone()).expect("utf-8 body"))
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().files.keys().cloned().collect()
    }

    /// Makes `op` (`list`, `read`, `write`, `remove`, `rename`) fail for `path`.
    pub fn fail(&self, op: &'static str, path: &str, fault: Fault) {
        self.state
            .lock()
            .unwrap()
            .faults
            .insert((op, normalize(path)), fault);
    }

    pub fn fail_connect(&self, fault: Fault) {
        self.state.lock().unwrap().connect_fault = Some(fault);
    }

    /// Fails connections to `host` only.
    pub fn fail_connect_to(&self, host: &str, fault: Fault) {
        self.state
            .lock()
            .unwrap()
            .host_faults
            .insert(host.to_string(), fault);
    }

    /// Makes every read and write wait `delay` before touching the tree.
    pub fn slow_transfers(&self, delay: Duration) {
        self.state.lock().unwrap().transfer_delay = Some(delay);
    }

    /// Directory paths exactly as passed to `list_dir`, in call order.
    pub fn listed(&self) -> Vec<String> {
        self.state.lock().unwrap().listed.clone()
    }

    /// `(opened, closed)` session counts.
    pub fn sessions(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        (state.opened, state.closed)
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn connected_configs(&self) -> Vec<RemoteConnectionConfig> {
        self.state.lock().unwrap().connected.clone()
    }

    fn check(&self, op: &'static str, path: &str) -> BridgeResult<()> {
        let state = self.state.lock().unwrap();
        match state.faults.get(&(op, path.to_string())) {
            Some(fault) => Err(fault.error(&format!("{op} {path}"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteConnector for MemoryRemote {
    async fn connect(
        &self,
        config: &RemoteConnectionConfig,
    ) -> BridgeResult<Arc<dyn RemoteSession>> {
        let mut state = self.state.lock().unwrap();
        if let Some(fault) = state
            .connect_fault
            .or_else(|| state.host_faults.get(&config.host).copied())
        {
            return Err(fault.error(&format!("connect {}", config.host)));
        }
        state.connected.push(config.clone());
        state.opened += 1;
        Ok(Arc::new(MemorySession {
            remote: self.clone(),
        }))
    }
}

struct MemorySession {
    remote: MemoryRemote,
}

impl MemorySession {
    async fn transfer_delay(&self) {
        let delay = self.remote.state.lock().unwrap().transfer_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteSession for MemorySession {
    async fn list_dir(&self, path: &str) -> BridgeResult<Vec<RemoteEntry>> {
        self.remote.state.lock().unwrap().listed.push(path.to_string());
        let dir = normalize(path);
        self.remote.check("list", &dir)?;
        let dir_segments = to_segments(&dir).len();

        let state = self.remote.state.lock().unwrap();
        let mut entries: BTreeMap<String, RemoteEntry> = BTreeMap::new();
        for (file_path, file) in &state.files {
            let segments = to_segments(file_path);
            if segments.len() <= dir_segments || segments[..dir_segments] != to_segments(&dir)[..] {
                continue;
            }
            let name = segments[dir_segments].to_string();
            let entry = if segments.len() == dir_segments + 1 {
                RemoteEntry::file(name.clone(), file.modified)
            } else {
                RemoteEntry::dir(name.clone())
            };
            entries.entry(name).or_insert(entry);
        }
        Ok(entries.into_values().collect())
    }

    async fn read_file(&self, path: &str) -> BridgeResult<Vec<u8>> {
        self.transfer_delay().await;
        let path = normalize(path);
        self.remote.check("read", &path)?;
        self.remote
            .state
            .lock()
            .unwrap()
            .files
            .get(&path)
            .map(|f| f.body.clone())
            .ok_or_else(|| BridgeError::Remote(format!("no such file: {path}")))
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> BridgeResult<()> {
        self.transfer_delay().await;
        let path = normalize(path);
        self.remote.check("write", &path)?;
        let mut state = self.remote.state.lock().unwrap();
        state.files.insert(
            path,
            RemoteFile {
                body: data.to_vec(),
                modified: Some(Utc::now()),
            },
        );
        state.writes += 1;
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> BridgeResult<()> {
        let path = normalize(path);
        self.remote.check("remove", &path)?;
        self.remote
            .state
            .lock()
            .unwrap()
            .files
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| BridgeError::Remote(format!("no such file: {path}")))
    }

    async fn rename(&self, from: &str, to: &str) -> BridgeResult<()> {
        let from = normalize(from);
        self.remote.check("rename", &from)?;
        let mut state = self.remote.state.lock().unwrap();
        let file = state
            .files
            .remove(&from)
            .ok_or_else(|| BridgeError::Remote(format!("no such file: {from}")))?;
        state.files.insert(normalize(to), file);
        Ok(())
    }

    async fn close(&self) -> BridgeResult<()> {
        self.remote.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

// ── Retry queue ─────────────────────────────────────────────────

struct QueuedMessage {
    id: String,
    body: String,
    receipt_handle: Option<String>,
    receive_count: u32,
}

#[derive(Default)]
struct QueueState {
    messages: Vec<QueuedMessage>,
    fail_send: bool,
    fail_receive: bool,
    receive_calls: usize,
    last_policy: Option<RedeliveryPolicy>,
}

/// A queue where received messages stay invisible until deleted or released.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, body: &str, receive_count: u32) {
        self.state.lock().unwrap().messages.push(QueuedMessage {
            id: Uuid::new_v4().to_string(),
            body: body.to_string(),
            receipt_handle: None,
            receive_count,
        });
    }

    pub fn bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .map(|m| m.body.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    /// Makes every in-flight message visible again.
    pub fn release_all(&self) {
        for message in &mut self.state.lock().unwrap().messages {
            message.receipt_handle = None;
        }
    }

    pub fn fail_send(&self) {
        self.state.lock().unwrap().fail_send = true;
    }

    pub fn fail_receive(&self) {
        self.state.lock().unwrap().fail_receive = true;
    }

    pub fn receive_calls(&self) -> usize {
        self.state.lock().unwrap().receive_calls
    }

    pub fn last_policy(&self) -> Option<RedeliveryPolicy> {
        self.state.lock().unwrap().last_policy.clone()
    }
}

#[async_trait]
impl RetryQueue for MemoryQueue {
    async fn send(&self, body: String) -> BridgeResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_send {
            return Err(BridgeError::Queue("injected send failure".into()));
        }
        let id = Uuid::new_v4().to_string();
        state.messages.push(QueuedMessage {
            id: id.clone(),
            body,
            receipt_handle: None,
            receive_count: 0,
        });
        Ok(Some(id))
    }

    async fn receive(
        &self,
        max_messages: i32,
        policy: &RedeliveryPolicy,
    ) -> BridgeResult<Vec<QueueMessage>> {
        let mut state = self.state.lock().unwrap();
        state.receive_calls += 1;
        state.last_policy = Some(policy.clone());
        if state.fail_receive {
            return Err(BridgeError::Queue("injected receive failure".into()));
        }
        let mut received = Vec::new();
        for message in state.messages.iter_mut() {
            if received.len() >= max_messages as usize {
                break;
            }
            if message.receipt_handle.is_some() {
                continue;
            }
            message.receive_count += 1;
            let handle = format!("{}#{}", message.id, message.receive_count);
            message.receipt_handle = Some(handle.clone());
            received.push(QueueMessage {
                body: message.body.clone(),
                receipt_handle: handle,
                receive_count: message.receive_count,
            });
        }
        Ok(received)
    }

    async fn delete(&self, receipt_handle: &str) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.messages.len();
        state
            .messages
            .retain(|m| m.receipt_handle.as_deref() != Some(receipt_handle));
        if state.messages.len() == before {
            return Err(BridgeError::Queue(format!(
                "unknown receipt handle {receipt_handle}"
            )));
        }
        Ok(())
    }
}

// ── Wiring ──────────────────────────────────────────────────────

pub struct Harness {
    pub store: MemoryStore,
    pub remote: MemoryRemote,
    pub queue: MemoryQueue,
    pub router: InvocationRouter,
}

/// Router over in-memory collaborators with a fixed stream configuration.
pub fn harness(stream_config: serde_json::Value) -> Harness {
    harness_with(stream_config, BridgeConfig::default())
}

pub fn harness_with(stream_config: serde_json::Value, config: BridgeConfig) -> Harness {
    let store = MemoryStore::new();
    let remote = MemoryRemote::new();
    let queue = MemoryQueue::new();
    let router = InvocationRouter::new(
        config,
        Arc::new(StaticConfigSource::new(streams(stream_config))),
        Arc::new(store.clone()),
        Arc::new(remote.clone()),
        Arc::new(queue.clone()),
    );
    Harness {
        store,
        remote,
        queue,
        router,
    }
}

pub fn s3_event(bucket: &str, key: &str) -> serde_json::Value {
    serde_json::json!({
        "Records": [
            { "s3": { "bucket": { "name": bucket }, "object": { "key": key } } }
        ]
    })
}

pub fn scheduled_event(rule: &str) -> serde_json::Value {
    serde_json::json!({
        "resources": [format!("arn:aws:events:us-east-1:1234567890:rule/{rule}")]
    })
}
