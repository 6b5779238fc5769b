#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use soaptap_inspector::config::SinkToggles;
use soaptap_inspector::pipeline::{Interceptor, NoInspection};

use common::*;

fn toggles(mask: u8) -> SinkToggles {
    SinkToggles {
        raw_console: mask & 0b0001 != 0,
        canonical_console: mask & 0b0010 != 0,
        raw_file: mask & 0b0100 != 0,
        canonical_file: mask & 0b1000 != 0,
    }
}

#[test]
fn every_toggle_combination_produces_exactly_its_outputs() {
    for mask in 0..16u8 {
        let sinks = toggles(mask);
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings(tmp.path(), sinks);
        let log_dir = settings.log_directory.clone();
        let console = SharedBuffer::default();
        let tap = Interceptor::builder(settings)
            .console_writer(console.clone())
            .inspection(NoInspection)
            .build();

        let mut request = add_request();
        let correlation = tap.on_request_received(&mut request);
        assert!(correlation.is_tracked(), "mask {mask:04b}");
        let mut reply = add_response();
        tap.on_reply_about_to_send(&mut reply, correlation);

        assert_eq!(request.read_text().unwrap(), ADD_REQUEST, "mask {mask:04b}");
        assert_eq!(reply.read_text().unwrap(), ADD_RESPONSE, "mask {mask:04b}");

        let files = files_in(&log_dir);
        let raw_files = files.iter().filter(|f| f.contains("_raw-")).count();
        let canonical_files = files.iter().filter(|f| f.contains("_canonical-")).count();
        assert_eq!(raw_files, if sinks.raw_file { 2 } else { 0 }, "mask {mask:04b}: {files:?}");
        assert_eq!(canonical_files, if sinks.canonical_file { 2 } else { 0 }, "mask {mask:04b}: {files:?}");

        let out = console.text();
        assert_eq!(out.contains("Request XML (raw):"), sinks.raw_console, "mask {mask:04b}");
        assert_eq!(out.contains("Response XML (raw):"), sinks.raw_console, "mask {mask:04b}");
        assert_eq!(
            out.matches("Canonical XML:").count(),
            if sinks.canonical_console { 2 } else { 0 },
            "mask {mask:04b}"
        );
        assert_eq!(out.is_empty(), !sinks.any_console(), "mask {mask:04b}");

        let metrics = tap.metrics();
        let expected_writes = 2 * [sinks.raw_console, sinks.canonical_console, sinks.raw_file, sinks.canonical_file]
            .iter()
            .filter(|on| **on)
            .count() as u64;
        assert_eq!(metrics.sink_writes.total(), expected_writes, "mask {mask:04b}");
        assert_eq!(metrics.sink_failures.total(), 0, "mask {mask:04b}");
    }
}

#[test]
fn canonical_is_not_computed_when_only_raw_is_enabled() {
    let tmp = tempfile::tempdir().unwrap();
    let console = SharedBuffer::default();
    let sinks = SinkToggles {
        raw_console: true,
        ..SinkToggles::default()
    };
    assert!(!sinks.wants_canonical());

    let tap = Interceptor::builder(settings(tmp.path(), sinks))
        .console_writer(console.clone())
        .inspection(NoInspection)
        .build();
    let mut request = add_request();
    tap.on_request_received(&mut request);

    let out = console.text();
    assert!(out.contains("Operation: Add"));
    assert!(out.contains(ADD_REQUEST));
    assert!(!out.contains("Canonical"));
}
