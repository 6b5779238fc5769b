#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;

use soaptap_inspector::app_state::AppState;
use soaptap_inspector::config::SinkToggles;
use soaptap_inspector::pipeline::{Interceptor, NoInspection};
use soaptap_inspector::services::CalculatorService;
use soaptap_inspector::transport::http::{handle_call, inbound_message, SOAP_ACTION};

use common::*;

fn state(base: &std::path::Path) -> (AppState, std::path::PathBuf) {
    let settings = settings(
        base,
        SinkToggles {
            raw_file: true,
            ..SinkToggles::default()
        },
    );
    let log_dir = settings.log_directory.clone();
    let tap = Interceptor::builder(settings)
        .console_writer(SharedBuffer::default())
        .inspection(NoInspection)
        .build();
    (AppState::new(Arc::new(tap)), log_dir)
}

fn soap_headers(action: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SOAP_ACTION, HeaderValue::from_static(action));
    headers.insert(header::HOST, HeaderValue::from_static("localhost:8080"));
    headers
}

fn divide_request(a: i64, b: i64) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><Divide xmlns="http://tempuri.org/"><a>{a}</a><b>{b}</b></Divide></s:Body></s:Envelope>"#
    )
}

#[tokio::test]
async fn add_call_is_served_and_logged() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, log_dir) = state(tmp.path());

    let headers = soap_headers("\"http://tempuri.org/IService1/Add\"");
    let request = inbound_message(&headers, CalculatorService::NAME, Bytes::from_static(ADD_REQUEST.as_bytes()));
    let (status, body) = handle_call(&state, CalculatorService::NAME, request).await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("<AddResult>5</AddResult>"), "{text}");

    let files = files_in(&log_dir);
    assert_eq!(files.len(), 2, "{files:?}");
    assert!(files.iter().any(|f| f.starts_with("Add_raw-request_")));
    assert!(files.iter().any(|f| f.starts_with("Add_raw-response_")));

    let metrics = state.metrics().render();
    assert!(metrics.contains("soaptap_captures_total{direction=\"request\"} 1"));
    assert!(metrics.contains("soaptap_round_trip_micros_count 1"));
}

#[tokio::test]
async fn service_fault_is_returned_and_logged_as_reply() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, log_dir) = state(tmp.path());

    let headers = soap_headers("http://tempuri.org/IService1/Divide");
    let body = Bytes::from(divide_request(4, 0));
    let request = inbound_message(&headers, CalculatorService::NAME, body);
    let (status, body) = handle_call(&state, CalculatorService::NAME, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("<faultcode>soap:Client</faultcode>"));

    let files = files_in(&log_dir);
    let reply = files.iter().find(|f| f.starts_with("Divide_raw-response_")).unwrap();
    let logged = std::fs::read_to_string(log_dir.join(reply)).unwrap();
    assert_eq!(logged, text);
}

#[tokio::test]
async fn unknown_service_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, log_dir) = state(tmp.path());

    let request = inbound_message(&HeaderMap::new(), "Nope.svc", Bytes::from_static(b"<x/>"));
    let (status, _) = handle_call(&state, "Nope.svc", request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(files_in(&log_dir).is_empty());
}

#[tokio::test]
async fn concurrent_calls_get_distinct_log_files() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, log_dir) = state(tmp.path());

    let mut handles = Vec::new();
    for i in 1..=8i64 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            let headers = soap_headers("http://tempuri.org/IService1/Divide");
            let request = inbound_message(&headers, CalculatorService::NAME, Bytes::from(divide_request(i * 10, i)));
            handle_call(&state, CalculatorService::NAME, request).await
        }));
    }
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8_lossy(&body).contains("<DivideResult>10</DivideResult>"));
    }

    assert_eq!(files_in(&log_dir).len(), 16);
}
