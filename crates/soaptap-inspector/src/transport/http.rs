//! SOAP over HTTP.
//!
//! One POST per call: the request runs through the endpoint's inspectors,
//! the service, then the inspectors again on the way out. Inspectors do
//! blocking I/O, so both passes run on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use soaptap_core::{Headers, Message};

use crate::app_state::AppState;
use crate::dispatch::ServiceFault;

/// Header names are case-insensitive; `SOAPAction` on the wire.
pub const SOAP_ACTION: &str = "soapaction";
const CONTENT_TYPE_XML: &str = "text/xml; charset=utf-8";

pub async fn soap_call(
    State(state): State<AppState>,
    Path(service): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = inbound_message(&headers, &service, body);
    let (status, body) = handle_call(&state, &service, request).await;
    (status, [(header::CONTENT_TYPE, CONTENT_TYPE_XML)], body).into_response()
}

/// Build the `Message` for an HTTP request. Header values are passed through
/// as raw bytes; decoding happens (and may fail) downstream.
pub fn inbound_message(headers: &HeaderMap, service: &str, body: Bytes) -> Message {
    let mut meta = Headers::new();
    if let Some(action) = headers.get(SOAP_ACTION) {
        meta = meta.with_action(Bytes::copy_from_slice(trim_quotes(action.as_bytes())));
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    meta = meta.with_to(format!("http://{host}/{service}"));
    Message::from_bytes(meta, body)
}

fn trim_quotes(v: &[u8]) -> &[u8] {
    let v = v.strip_prefix(b"\"").unwrap_or(v);
    v.strip_suffix(b"\"").unwrap_or(v)
}

pub async fn handle_call(state: &AppState, service: &str, request: Message) -> (StatusCode, Bytes) {
    let (Some(svc), Some(endpoint)) = (state.dispatcher().get(service), state.endpoint(service)) else {
        let fault = ServiceFault::Client(format!("no service at /{service}"));
        return (StatusCode::NOT_FOUND, Bytes::from(fault.to_envelope()));
    };

    let ep = Arc::clone(&endpoint);
    let inbound = tokio::task::spawn_blocking(move || {
        let mut request = request;
        let states = ep.after_receive_request(&mut request);
        (request, states)
    })
    .await;
    let (request, states) = match inbound {
        Ok(v) => v,
        Err(e) => return internal_error("request inspection", &e),
    };

    let (status, reply) = match svc.invoke(request).await {
        Ok(reply) => (StatusCode::OK, reply),
        Err(fault) => {
            tracing::warn!(service, code = fault.code(), error = %fault, "service fault");
            (StatusCode::INTERNAL_SERVER_ERROR, fault.into_message())
        }
    };

    let outbound = tokio::task::spawn_blocking(move || {
        let mut reply = reply;
        endpoint.before_send_reply(&mut reply, states);
        reply.read_body()
    })
    .await;
    match outbound {
        Ok(Ok(body)) => (status, body),
        Ok(Err(e)) => internal_error("reply body", &e),
        Err(e) => internal_error("reply inspection", &e),
    }
}

fn internal_error(stage: &str, err: &dyn std::error::Error) -> (StatusCode, Bytes) {
    tracing::error!(stage, error = %err, "soap call failed");
    let fault = ServiceFault::Server(format!("{stage} failed"));
    (StatusCode::INTERNAL_SERVER_ERROR, Bytes::from(fault.to_envelope()))
}
