#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use soaptap_core::{Headers, Message};
use soaptap_inspector::config::{Settings, SinkToggles};

pub const ADD_ACTION: &str = "http://tempuri.org/IService1/Add";
pub const ENDPOINT: &str = "http://localhost:8080/Service1.svc";

pub const ADD_REQUEST: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Header><Action s:mustUnderstand="1" xmlns="http://schemas.microsoft.com/ws/2005/05/addressing/none">http://tempuri.org/IService1/Add</Action></s:Header><s:Body><Add xmlns="http://tempuri.org/"><a>2</a><b>3</b></Add></s:Body></s:Envelope>"#;

pub const ADD_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><AddResponse xmlns="http://tempuri.org/"><AddResult>5</AddResult></AddResponse></s:Body></s:Envelope>"#;

/// Clonable in-memory console.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

/// Defaults rooted at `base`, with the given sinks.
pub fn settings(base: &Path, sinks: SinkToggles) -> Settings {
    let mut s = Settings::with_defaults(base, day()).unwrap();
    s.sinks = sinks;
    s
}

pub fn add_request() -> Message {
    let headers = Headers::new().with_action(ADD_ACTION).with_to(ENDPOINT);
    Message::from_reader(headers, Cursor::new(ADD_REQUEST.as_bytes().to_vec()))
}

pub fn add_response() -> Message {
    Message::from_bytes(Headers::new(), ADD_RESPONSE)
}

/// Files directly under `dir`, sorted by name.
pub fn files_in(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
