//! JSON-RPC over HTTP endpoint.

use std::future::Future;
use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use remote_temperature_rpc::wire::{
    RecordTemperatureParams, RpcCall, RpcFault, RpcReply, INVALID_PARAMS, INVALID_REQUEST,
    JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use remote_temperature_rpc::RECORD_TEMPERATURE;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::recorder::Recorder;

/// Creates the router serving RPC calls on `/` and `/RPC2`.
pub fn create_router(recorder: Arc<Recorder>) -> Router {
    Router::new()
        .route("/", post(handle_call))
        .route("/RPC2", post(handle_call))
        .with_state(recorder)
}

/// Serves RPC calls on `listener` until `shutdown` resolves.
///
/// Calls already in progress are allowed to finish.
pub async fn serve<F>(
    listener: TcpListener,
    recorder: Arc<Recorder>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(recorder))
        .with_graceful_shutdown(shutdown)
        .await
}

/// POST / - Dispatch one call
async fn handle_call(State(recorder): State<Arc<Recorder>>, body: Bytes) -> Json<RpcReply> {
    let call: RpcCall = match serde_json::from_slice(&body) {
        Ok(call) => call,
        Err(e) => {
            warn!("Rejecting undecodable RPC request: {}", e);
            let code = if e.is_data() {
                INVALID_REQUEST
            } else {
                PARSE_ERROR
            };
            return Json(RpcReply::fault(None, RpcFault::new(code, e.to_string())));
        }
    };

    Json(dispatch(&recorder, call).await)
}

async fn dispatch(recorder: &Recorder, call: RpcCall) -> RpcReply {
    debug!("RPC call {} (id {})", call.method, call.id);

    if call.jsonrpc != JSONRPC_VERSION {
        return RpcReply::fault(
            Some(call.id),
            RpcFault::new(
                INVALID_REQUEST,
                format!("unsupported jsonrpc version {:?}", call.jsonrpc),
            ),
        );
    }

    match call.method.as_str() {
        RECORD_TEMPERATURE => {
            match serde_json::from_value::<RecordTemperatureParams>(call.params) {
                Ok(params) => RpcReply::result(call.id, recorder.record(params.into()).await),
                Err(e) => RpcReply::fault(
                    Some(call.id),
                    RpcFault::new(INVALID_PARAMS, format!("{RECORD_TEMPERATURE}: {e}")),
                ),
            }
        }
        other => RpcReply::fault(
            Some(call.id),
            RpcFault::new(METHOD_NOT_FOUND, format!("method \"{other}\" is not supported")),
        ),
    }
}
