//! JSON-RPC endpoint for the A2A methods.
//!
//! Every reply is HTTP 200; failures travel in the JSON-RPC `error` member.
//! `message/stream` answers with a server-sent event stream whose events each
//! carry one JSON-RPC response.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::task::JoinHandle;

use super::routes::AppState;
use crate::a2a::types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, MessageSendParams, Task, TaskIdParams,
    TaskStatusUpdateEvent, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION,
    METHOD_NOT_FOUND, PARSE_ERROR, TASK_NOT_CANCELABLE, TASK_NOT_FOUND,
};
use crate::pipeline::{PipelineOutcome, PipelineTask};
use crate::task::{StoreError, TaskState};

/// Dispatch one JSON-RPC request.
pub async fn handle_rpc(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Unparseable JSON-RPC body: {}", e);
            return rpc_error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e));
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => return rpc_error(id, INVALID_REQUEST, format!("Invalid request: {}", e)),
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return rpc_error(
            request.id,
            INVALID_REQUEST,
            format!("Unsupported jsonrpc version: {}", request.jsonrpc),
        );
    }

    tracing::debug!("JSON-RPC {} (id {})", request.method, request.id);

    match request.method.as_str() {
        "message/send" => match parse_params(&request) {
            Ok(params) => message_send(&state, request.id, params).await,
            Err(response) => response,
        },
        "message/stream" => match parse_params(&request) {
            Ok(params) => message_stream(state, request.id, params).await,
            Err(response) => response,
        },
        "tasks/get" => match parse_params::<TaskIdParams>(&request) {
            Ok(params) => tasks_get(&state, request.id, &params.id).await,
            Err(response) => response,
        },
        "tasks/cancel" => match parse_params::<TaskIdParams>(&request) {
            Ok(params) => tasks_cancel(&state, request.id, &params.id).await,
            Err(response) => response,
        },
        other => rpc_error(
            request.id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        ),
    }
}

async fn message_send(state: &Arc<AppState>, id: Value, params: MessageSendParams) -> Response {
    let (task, _, handle) = match start_task(state, &params).await {
        Ok(started) => started,
        Err(e) => return rpc_error(id, INVALID_PARAMS, e.to_string()),
    };

    if !params.blocking() {
        return rpc_result(id, &task);
    }

    if let Err(e) = handle.await {
        tracing::error!("Task {} worker ended abnormally: {}", task.id, e);
    }

    match state.tasks.get(&task.id).await {
        Some(task) => rpc_result(id, &task),
        None => rpc_error(
            id,
            INTERNAL_ERROR,
            format!("Task {} disappeared before it finished", task.id),
        ),
    }
}

enum StreamStep {
    Event(TaskStatusUpdateEvent),
    Lagged(u64),
    Finished,
}

async fn message_stream(state: Arc<AppState>, id: Value, params: MessageSendParams) -> Response {
    let (task, mut events, mut handle) = match start_task(&state, &params).await {
        Ok(started) => started,
        Err(e) => return rpc_error(id, INVALID_PARAMS, e.to_string()),
    };

    let stream = async_stream::stream! {
        if let Some(event) = sse_event(&id, &task) {
            yield Ok::<Event, Infallible>(event);
        }

        // Forward live events until a final one arrives or the worker exits.
        loop {
            let step = tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => StreamStep::Event(event),
                    Err(RecvError::Lagged(n)) => StreamStep::Lagged(n),
                    Err(RecvError::Closed) => StreamStep::Finished,
                },
                _ = &mut handle => StreamStep::Finished,
            };

            match step {
                StreamStep::Event(event) => {
                    let is_final = event.is_final;
                    if let Some(sse) = sse_event(&id, &event) {
                        yield Ok(sse);
                    }
                    if is_final {
                        return;
                    }
                }
                StreamStep::Lagged(n) => {
                    tracing::warn!("Stream for task {} skipped {} events", task.id, n);
                }
                StreamStep::Finished => break,
            }
        }

        // The worker is done; flush whatever it emitted before exiting.
        loop {
            match events.try_recv() {
                Ok(event) => {
                    let is_final = event.is_final;
                    if let Some(sse) = sse_event(&id, &event) {
                        yield Ok(sse);
                    }
                    if is_final {
                        break;
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn tasks_get(state: &Arc<AppState>, id: Value, task_id: &str) -> Response {
    match state.tasks.get(task_id).await {
        Some(task) => rpc_result(id, &task),
        None => rpc_error(id, TASK_NOT_FOUND, format!("Task not found: {}", task_id)),
    }
}

async fn tasks_cancel(state: &Arc<AppState>, id: Value, task_id: &str) -> Response {
    let Some(task) = state.tasks.get(task_id).await else {
        return rpc_error(id, TASK_NOT_FOUND, format!("Task not found: {}", task_id));
    };
    if task.status.state.is_terminal() {
        return rpc_error(
            id,
            TASK_NOT_CANCELABLE,
            format!("Task {} is already {}", task_id, task.status.state),
        );
    }

    let pipeline_task = PipelineTask::new(task.id.clone(), task.context_id.clone(), None, None);
    state
        .orchestrator
        .cancel(&pipeline_task, state.tasks.as_ref())
        .await;

    match state.tasks.get(task_id).await {
        Some(task) if task.status.state == TaskState::Canceled => rpc_result(id, &task),
        // A terminal status landed between the check and the cancel.
        Some(task) => rpc_error(
            id,
            TASK_NOT_CANCELABLE,
            format!("Task {} is already {}", task_id, task.status.state),
        ),
        None => rpc_error(id, TASK_NOT_FOUND, format!("Task not found: {}", task_id)),
    }
}

type StartedTask = (
    Task,
    broadcast::Receiver<TaskStatusUpdateEvent>,
    JoinHandle<Option<PipelineOutcome>>,
);

/// Register the task, subscribe to its events and run it in the background.
async fn start_task(
    state: &Arc<AppState>,
    params: &MessageSendParams,
) -> Result<StartedTask, StoreError> {
    let (task, events) = state
        .tasks
        .create_subscribed(
            params.message.task_id.clone(),
            params.message.context_id.clone(),
        )
        .await?;
    let pipeline_task = PipelineTask::from_params(&task.id, &task.context_id, params);

    let orchestrator = Arc::clone(&state.orchestrator);
    let tasks = Arc::clone(&state.tasks);
    let handle = tokio::spawn(async move {
        let outcome = orchestrator
            .handle(&pipeline_task, tasks.as_ref())
            .await;
        if outcome.is_none() {
            tasks.mark_dropped(&pipeline_task.task_id).await;
        }
        outcome
    });

    Ok((task, events, handle))
}

fn parse_params<T: DeserializeOwned>(request: &JsonRpcRequest) -> Result<T, Response> {
    serde_json::from_value(request.params.clone()).map_err(|e| {
        rpc_error(
            request.id.clone(),
            INVALID_PARAMS,
            format!("Invalid params for {}: {}", request.method, e),
        )
    })
}

fn rpc_result<T: Serialize>(id: Value, result: &T) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Json(JsonRpcResponse::success(id, value)).into_response(),
        Err(e) => rpc_error(id, INTERNAL_ERROR, format!("Failed to encode result: {}", e)),
    }
}

fn rpc_error(id: Value, code: i32, message: String) -> Response {
    Json(JsonRpcResponse::error(id, JsonRpcError::new(code, message))).into_response()
}

fn sse_event<T: Serialize>(id: &Value, result: &T) -> Option<Event> {
    let response = match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id.clone(), value),
        Err(e) => {
            tracing::warn!("Failed to encode stream event: {}", e);
            return None;
        }
    };
    match Event::default().json_data(response) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Failed to encode stream event: {}", e);
            None
        }
    }
}
