// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire messages exchanged with the broker.
//!
//! Every message is a JSON object with a `type` tag. Requests carry an id that
//! the matching response echoes back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bundle::DataBundle;
use crate::traits::DataRequestScope;

/// Messages sent from the runner to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RunnerMessage {
    #[serde(rename = "runner:taskdatarequest")]
    TaskDataRequest {
        task_id: String,
        request_id: String,
        request_params: DataRequestScope,
    },
    #[serde(rename = "runner:rpc")]
    RpcCall {
        call_id: String,
        task_id: String,
        name: String,
        params: Vec<Value>,
    },
}

/// Messages delivered by the broker to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum BrokerMessage {
    #[serde(rename = "broker:taskdataresponse")]
    TaskDataResponse {
        task_id: String,
        request_id: String,
        data: Option<Box<DataBundle>>,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(rename = "broker:rpcresponse")]
    RpcResponse {
        call_id: String,
        task_id: String,
        status: RpcStatus,
        #[serde(default)]
        data: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcStatus {
    Success,
    Error,
}
