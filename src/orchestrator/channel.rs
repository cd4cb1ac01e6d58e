// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::bundle::DataBundle;
use crate::errors::TransportError;
use crate::observability::messages::orchestrator::{BrokerMessageDropped, PendingRequestsFailed};
use crate::observability::messages::StructuredLog;
use crate::orchestrator::messages::{BrokerMessage, RpcStatus, RunnerMessage};
use crate::traits::{DataRequestScope, Orchestrator};

type Pending<T> = Mutex<HashMap<String, oneshot::Sender<Result<T, TransportError>>>>;

/// Orchestrator client speaking the broker message protocol over channels.
///
/// Outbound requests are written to an unbounded channel owned by the transport
/// layer. The transport feeds every inbound message to
/// [`ChannelOrchestrator::handle_broker_message`], which completes the request
/// with the matching id. Cancelling the shutdown token fails every request
/// still waiting for an answer.
pub struct ChannelOrchestrator {
    outbound: mpsc::UnboundedSender<RunnerMessage>,
    next_id: AtomicU64,
    data_requests: Pending<DataBundle>,
    rpc_calls: Pending<Value>,
    shutdown: CancellationToken,
}

impl ChannelOrchestrator {
    pub fn new(outbound: mpsc::UnboundedSender<RunnerMessage>, shutdown: CancellationToken) -> Self {
        Self {
            outbound,
            next_id: AtomicU64::new(1),
            data_requests: Mutex::new(HashMap::new()),
            rpc_calls: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    fn next_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Complete the pending request an inbound message answers.
    ///
    /// Responses nobody waits for any more are dropped with a debug log.
    pub async fn handle_broker_message(&self, message: BrokerMessage) {
        match message {
            BrokerMessage::TaskDataResponse {
                task_id,
                request_id,
                data,
                error,
            } => {
                let result = match (data, error) {
                    (Some(bundle), None) => Ok(*bundle),
                    (_, Some(message)) => Err(TransportError::Malformed(message)),
                    (None, None) => Err(TransportError::UnknownTask(task_id)),
                };
                let sender = self.data_requests.lock().await.remove(&request_id);
                deliver(sender, result, &request_id);
            }
            BrokerMessage::RpcResponse {
                call_id,
                status,
                data,
                ..
            } => {
                let result = match status {
                    RpcStatus::Success => Ok(data),
                    RpcStatus::Error => Err(TransportError::RpcFailed {
                        method: call_id.clone(),
                        message: data
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| data.to_string()),
                    }),
                };
                let sender = self.rpc_calls.lock().await.remove(&call_id);
                deliver(sender, result, &call_id);
            }
        }
    }

    /// Fail every request still waiting for a response.
    pub async fn fail_pending(&self) {
        let mut data_requests = self.data_requests.lock().await;
        let mut rpc_calls = self.rpc_calls.lock().await;
        let count = data_requests.len() + rpc_calls.len();
        for (_, tx) in data_requests.drain() {
            let _ = tx.send(Err(TransportError::Closed));
        }
        for (_, tx) in rpc_calls.drain() {
            let _ = tx.send(Err(TransportError::Closed));
        }
        if count > 0 {
            PendingRequestsFailed { count }.log();
        }
    }

    async fn send_and_wait<T>(
        &self,
        pending: &Pending<T>,
        id: String,
        message: RunnerMessage,
    ) -> Result<T, TransportError> {
        if self.shutdown.is_cancelled() {
            return Err(TransportError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        pending.lock().await.insert(id.clone(), tx);

        if self.outbound.send(message).is_err() {
            pending.lock().await.remove(&id);
            return Err(TransportError::Closed);
        }

        tokio::select! {
            response = rx => response.unwrap_or(Err(TransportError::Closed)),
            _ = self.shutdown.cancelled() => {
                pending.lock().await.remove(&id);
                Err(TransportError::Closed)
            }
        }
    }
}

fn deliver<T>(
    sender: Option<oneshot::Sender<Result<T, TransportError>>>,
    result: Result<T, TransportError>,
    id: &str,
) {
    match sender {
        Some(tx) => {
            let _ = tx.send(result);
        }
        None => BrokerMessageDropped { id }.log(),
    }
}

#[async_trait]
impl Orchestrator for ChannelOrchestrator {
    async fn request_data(
        &self,
        task_id: &str,
        scope: DataRequestScope,
    ) -> Result<DataBundle, TransportError> {
        let request_id = self.next_id();
        let message = RunnerMessage::TaskDataRequest {
            task_id: task_id.to_string(),
            request_id: request_id.clone(),
            request_params: scope,
        };
        self.send_and_wait(&self.data_requests, request_id, message).await
    }

    async fn rpc_call(
        &self,
        task_id: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, TransportError> {
        let call_id = self.next_id();
        let message = RunnerMessage::RpcCall {
            call_id: call_id.clone(),
            task_id: task_id.to_string(),
            name: method.to_string(),
            params: args,
        };
        self.send_and_wait(&self.rpc_calls, call_id, message)
            .await
            .map_err(|err| match err {
                TransportError::RpcFailed { message, .. } => TransportError::RpcFailed {
                    method: method.to_string(),
                    message,
                },
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::fixtures::bundle_with_items;
    use serde_json::json;
    use std::sync::Arc;

    /// Broker stand-in answering every request from `rx` through `client`.
    fn spawn_broker(
        client: Arc<ChannelOrchestrator>,
        mut rx: mpsc::UnboundedReceiver<RunnerMessage>,
    ) -> tokio::task::JoinHandle<Vec<RunnerMessage>> {
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(message) = rx.recv().await {
                let reply = match &message {
                    RunnerMessage::TaskDataRequest {
                        task_id,
                        request_id,
                        ..
                    } => BrokerMessage::TaskDataResponse {
                        task_id: task_id.clone(),
                        request_id: request_id.clone(),
                        data: Some(Box::new(bundle_with_items(3))),
                        error: None,
                    },
                    RunnerMessage::RpcCall {
                        call_id,
                        task_id,
                        name,
                        ..
                    } => BrokerMessage::RpcResponse {
                        call_id: call_id.clone(),
                        task_id: task_id.clone(),
                        status: if name == "helpers.fail" {
                            RpcStatus::Error
                        } else {
                            RpcStatus::Success
                        },
                        data: if name == "helpers.fail" {
                            json!("denied by broker")
                        } else {
                            json!({"echo": name})
                        },
                    },
                };
                seen.push(message);
                client.handle_broker_message(reply).await;
            }
            seen
        })
    }

    #[tokio::test]
    async fn test_data_request_round_trip() {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::new(ChannelOrchestrator::new(tx, CancellationToken::new()));
        let _broker = spawn_broker(Arc::clone(&client), rx);

        let bundle = client.request_data("t-1", DataRequestScope::All).await.unwrap();
        assert_eq!(bundle.items.len(), 3);
    }

    #[tokio::test]
    async fn test_rpc_success_and_error_responses() {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::new(ChannelOrchestrator::new(tx, CancellationToken::new()));
        let _broker = spawn_broker(Arc::clone(&client), rx);

        let value = client
            .rpc_call("t-1", "helpers.httpRequest", vec![json!(1)])
            .await
            .unwrap();
        assert_eq!(value, json!({"echo": "helpers.httpRequest"}));

        let err = client.rpc_call("t-1", "helpers.fail", vec![]).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::RpcFailed {
                method: "helpers.fail".to_string(),
                message: "denied by broker".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_shutdown_fails_waiting_requests() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let client = Arc::new(ChannelOrchestrator::new(tx, shutdown.clone()));

        let waiting = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.request_data("t-1", DataRequestScope::All).await })
        };
        tokio::task::yield_now().await;
        shutdown.cancel();

        let result = waiting.await.unwrap();
        assert_eq!(result.unwrap_err(), TransportError::Closed);
    }

    #[tokio::test]
    async fn test_closed_outbound_channel_fails_immediately() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let client = ChannelOrchestrator::new(tx, CancellationToken::new());

        let err = client.rpc_call("t-1", "helpers.httpRequest", vec![]).await.unwrap_err();
        assert_eq!(err, TransportError::Closed);
    }

    #[tokio::test]
    async fn test_fail_pending_completes_waiters() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = Arc::new(ChannelOrchestrator::new(tx, CancellationToken::new()));

        let waiting = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.rpc_call("t-1", "helpers.httpRequest", vec![]).await })
        };
        // The request is registered before it is sent.
        assert!(rx.recv().await.is_some());
        client.fail_pending().await;

        assert_eq!(waiting.await.unwrap().unwrap_err(), TransportError::Closed);
    }
}
