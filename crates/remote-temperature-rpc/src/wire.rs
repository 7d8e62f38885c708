//! JSON-RPC 2.0 envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{TemperatureRecord, RECORD_TEMPERATURE};

/// Protocol version carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;

/// A method call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCall {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: u64,
}

impl RpcCall {
    /// Builds a `record_temperature` call.
    ///
    /// JSON has no NaN or infinity: a non-finite `time` or `temperature` is
    /// sent as `null`, which the server answers with an [`INVALID_PARAMS`]
    /// fault.
    pub fn record_temperature(id: u64, record: &TemperatureRecord) -> Self {
        let params = vec![
            Value::from(record.device_id.as_str()),
            Value::from(record.sensor_id.as_str()),
            Value::from(record.time),
            Value::from(record.temperature),
        ];
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: RECORD_TEMPERATURE.to_string(),
            params: Value::Array(params),
            id,
        }
    }
}

/// Positional parameters of `record_temperature`:
/// `[device_id, sensor_id, time, temperature]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTemperatureParams(pub String, pub String, pub f64, pub f64);

impl From<RecordTemperatureParams> for TemperatureRecord {
    fn from(params: RecordTemperatureParams) -> Self {
        let RecordTemperatureParams(device_id, sensor_id, time, temperature) = params;
        TemperatureRecord {
            device_id,
            sensor_id,
            time,
            temperature,
        }
    }
}

/// A fault object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcFault {
    pub code: i64,
    pub message: String,
}

impl RpcFault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A reply carrying either a result or a fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcFault>,
    /// `None` when the request id could not be determined.
    pub id: Option<u64>,
}

impl RpcReply {
    /// A successful reply.
    pub fn result(id: u64, result: impl Into<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result.into()),
            error: None,
            id: Some(id),
        }
    }

    /// A fault reply.
    pub fn fault(id: Option<u64>, fault: RpcFault) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(fault),
            id,
        }
    }
}
