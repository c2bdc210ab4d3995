//! Shared utilities for integration tests.

#![allow(dead_code)]

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::Bytes;
use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::Instant;

use rpc_pinger::failover::Endpoint;
use rpc_pinger::notify::{Notification, NotificationKind, Notifier, NotifyError};
use rpc_pinger::observability::MetricsSink;
use rpc_pinger::probe::{FeeMode, PingResult, ProbeTransport, TransportError};
use rpc_pinger::report::ReportWindow;

/// How the scripted endpoint answers.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Confirmed on the first poll.
    Confirm,
    /// Confirmed once this long has passed since submission.
    ConfirmAfter(Duration),
    /// Accepted but never confirmed.
    NeverConfirm,
    /// Submission never returns.
    HangOnSubmit,
    /// Submission fails.
    RejectSubmit(TransportError),
    /// Priority fees are refused; legacy fees confirm immediately.
    RejectPriorityFee,
}

/// Programmable transport keyed by endpoint URL.
pub struct ScriptedTransport {
    default: Behavior,
    behaviors: Mutex<HashMap<String, Behavior>>,
    submitted: Mutex<Vec<(String, FeeMode)>>,
    sent_at: Mutex<HashMap<String, Instant>>,
    polls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            behaviors: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            sent_at: Mutex::new(HashMap::new()),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, url: &str, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(url.to_string(), behavior);
    }

    pub fn submitted(&self) -> Vec<(String, FeeMode)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn behavior(&self, url: &str) -> Behavior {
        self.behaviors
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn submit(&self, endpoint: &Endpoint, fee: FeeMode) -> Result<String, TransportError> {
        let tx_id = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push((endpoint.url.clone(), fee));
            format!("tx-{}", submitted.len())
        };

        match self.behavior(&endpoint.url) {
            Behavior::HangOnSubmit => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
            }
            Behavior::RejectSubmit(err) => return Err(err),
            Behavior::RejectPriorityFee => {
                if matches!(fee, FeeMode::Priority { .. }) {
                    return Err(TransportError::FeeRejected("max priority fee too low".into()));
                }
            }
            _ => {}
        }

        self.sent_at.lock().unwrap().insert(tx_id.clone(), Instant::now());
        Ok(tx_id)
    }

    async fn is_confirmed(&self, endpoint: &Endpoint, tx_id: &str) -> Result<bool, TransportError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.behavior(&endpoint.url) {
            Behavior::NeverConfirm => Ok(false),
            Behavior::ConfirmAfter(delay) => {
                let sent = self.sent_at.lock().unwrap().get(tx_id).copied();
                Ok(sent.map(|at| at.elapsed() >= delay).unwrap_or(false))
            }
            _ => Ok(true),
        }
    }
}

/// Notifier that keeps everything it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent().into_iter().map(|n| n.kind).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Metrics sink that counts calls.
#[derive(Default)]
pub struct RecordingMetrics {
    pub probes: AtomicUsize,
    pub windows: Mutex<Vec<ReportWindow>>,
}

impl MetricsSink for RecordingMetrics {
    fn record_probe(&self, _result: &PingResult) {
        self.probes.fetch_add(1, Ordering::SeqCst);
    }

    fn record_window(&self, window: &ReportWindow) {
        self.windows.lock().unwrap().push(window.clone());
    }
}

/// Start a webhook receiver that answers every POST with `status` and
/// captures the request bodies.
pub async fn start_webhook_receiver(status: u16) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let captured = bodies.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let captured = captured.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 64 * 1024];
                let mut read = 0;
                loop {
                    let n = match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    read += n;
                    if request_complete(&buf[..read]) {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                if let Some((_, body)) = request.split_once("\r\n\r\n") {
                    captured.lock().unwrap().push(body.to_string());
                }

                let status_text = match status {
                    200 => "200 OK",
                    204 => "204 No Content",
                    500 => "500 Internal Server Error",
                    _ => "400 Bad Request",
                };
                let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_text);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, bodies)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    body.len() >= length
}

/// How the mock node answers receipt lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiptMode {
    #[default]
    Success,
    Reverted,
    /// Never mined.
    Missing,
}

/// Programmable behaviour of the mock node.
#[derive(Debug, Default)]
pub struct NodeScript {
    /// Answer to `eth_getTransactionCount`.
    pub transaction_count: u64,
    /// The next this-many sends never answer.
    pub hang_sends: usize,
    /// Error messages for the next sends, in order.
    pub reject_sends: VecDeque<String>,
    /// Refuse EIP-1559 transactions.
    pub reject_dynamic_fee: bool,
    pub receipt: ReceiptMode,
}

/// One raw transaction the node received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub nonce: u64,
    pub tx_type: u8,
    pub max_priority_fee: Option<u128>,
}

/// JSON-RPC node speaking just enough of the eth namespace for probes.
#[derive(Default)]
pub struct MockNode {
    script: Mutex<NodeScript>,
    sent: Mutex<Vec<SentTx>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockNode {
    pub fn update(&self, f: impl FnOnce(&mut NodeScript)) {
        f(&mut self.script.lock().unwrap());
    }

    /// Every send attempt, accepted or not.
    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.lock().unwrap().clone()
    }

    pub fn nonces(&self) -> Vec<u64> {
        self.sent().into_iter().map(|tx| tx.nonce).collect()
    }

    /// Params of every call to `method`.
    pub fn calls(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

/// Start a mock node on an ephemeral port, returning its URL.
pub async fn start_rpc_node(script: NodeScript) -> (String, Arc<MockNode>) {
    let node = Arc::new(MockNode {
        script: Mutex::new(script),
        ..MockNode::default()
    });
    let app = Router::new().route("/", post(rpc_handler)).with_state(node.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), node)
}

async fn rpc_handler(State(node): State<Arc<MockNode>>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();
    node.calls.lock().unwrap().push((method.clone(), params.clone()));

    let answer = match method.as_str() {
        "eth_chainId" => Ok(json!("0x7a69")),
        "eth_gasPrice" => Ok(json!("0x3b9aca00")),
        "eth_getTransactionCount" => {
            let count = node.script.lock().unwrap().transaction_count;
            Ok(json!(format!("0x{:x}", count)))
        }
        "eth_sendRawTransaction" => send_raw_transaction(&node, &params).await,
        "eth_getTransactionReceipt" => {
            let hash = params[0].as_str().unwrap_or_default().to_string();
            let mode = node.script.lock().unwrap().receipt;
            match mode {
                ReceiptMode::Success => Ok(receipt_json(&hash, true)),
                ReceiptMode::Reverted => Ok(receipt_json(&hash, false)),
                ReceiptMode::Missing => Ok(Value::Null),
            }
        }
        other => Err(format!("method {} not found", other)),
    };

    Json(match answer {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(message) => json!({ "jsonrpc": "2.0", "id": id, "error": { "code": -32000, "message": message } }),
    })
}

async fn send_raw_transaction(node: &MockNode, params: &Value) -> Result<Value, String> {
    let raw: Bytes = serde_json::from_value(params[0].clone()).unwrap();
    let mut buf: &[u8] = raw.as_ref();
    let envelope = TxEnvelope::decode_2718(&mut buf).unwrap();
    let tx = SentTx {
        nonce: envelope.nonce(),
        tx_type: u8::from(envelope.tx_type()),
        max_priority_fee: envelope.max_priority_fee_per_gas(),
    };
    let hash = format!("{:#x}", envelope.tx_hash());
    node.sent.lock().unwrap().push(tx.clone());

    let hang = {
        let mut script = node.script.lock().unwrap();
        if script.hang_sends > 0 {
            script.hang_sends -= 1;
            true
        } else if let Some(message) = script.reject_sends.pop_front() {
            return Err(message);
        } else if script.reject_dynamic_fee && tx.tx_type == 2 {
            return Err("transaction type not supported".into());
        } else {
            false
        }
    };
    if hang {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    Ok(json!(hash))
}

fn receipt_json(hash: &str, success: bool) -> Value {
    json!({
        "type": "0x2",
        "status": if success { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0x5208",
        "logs": [],
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": format!("0x{}", "1".repeat(64)),
        "blockNumber": "0x1",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
        "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
        "to": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
        "contractAddress": null
    })
}
