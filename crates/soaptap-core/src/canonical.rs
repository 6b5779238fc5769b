//! Canonical envelope transcoder.
//!
//! Rewrites a captured SOAP payload into a fixed, tool-friendly shape:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <!-- Canonical Request for Add
//! Endpoint: http://host/Service1.svc
//! -->
//! <soapenv:Envelope xmlns:soapenv="<original root ns>" xmlns:tem="http://tempuri.org/">
//!   <soapenv:Header/>
//!   <soapenv:Body>
//!     <first operation element of the original Body/>
//!   </soapenv:Body>
//! </soapenv:Envelope>
//! ```
//!
//! The operation element is copied byte for byte, text and whitespace
//! included; only the wrapper around it is indented.
//!
//! Unparsable input or input without a `Body` operation degrades to a
//! synthesized template (requests) or the raw payload (responses). Any other
//! failure returns the raw payload behind an error comment. This function
//! never fails.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;

use crate::error::{Result, TapError};
use crate::message::Direction;

/// SOAP 1.1 envelope namespace, used by the synthesized template.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Auxiliary namespace declared on every canonical envelope.
pub const AUX_NS: &str = "http://tempuri.org/";

const DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Rewrite `raw` into the canonical envelope.
pub fn transcode(raw: &str, operation: &str, endpoint: &str, direction: Direction) -> String {
    let extracted = match extract(raw) {
        Ok(Some(extracted)) => extracted,
        Ok(None) => {
            tracing::debug!(%operation, "no operation element under Body; using fallback");
            return fallback(raw, operation, endpoint, direction);
        }
        Err(TapError::ParseFailure(reason)) => {
            tracing::debug!(%operation, %reason, "payload is not well-formed; using fallback");
            return fallback(raw, operation, endpoint, direction);
        }
        Err(e) => return error_comment(&e, raw),
    };

    match render(&extracted, operation, endpoint, direction) {
        Ok(doc) => doc,
        Err(e) => error_comment(&e, raw),
    }
}

/// Placeholder request envelope for payloads that could not be parsed.
pub fn request_template(operation: &str, endpoint: &str) -> String {
    let name = element_name(operation);
    format!(
        "{DECLARATION}\n{comment}\n\
<soapenv:Envelope xmlns:soapenv=\"{SOAP_ENVELOPE_NS}\" xmlns:tem=\"{AUX_NS}\">\n  \
<soapenv:Header/>\n  \
<soapenv:Body>\n    \
<tem:{name}>\n      \
<!-- Add parameters here -->\n    \
</tem:{name}>\n  \
</soapenv:Body>\n\
</soapenv:Envelope>",
        comment = comment_header(operation, endpoint, Direction::Request),
    )
}

fn fallback(raw: &str, operation: &str, endpoint: &str, direction: Direction) -> String {
    match direction {
        Direction::Request => request_template(operation, endpoint),
        Direction::Response => raw.to_string(),
    }
}

fn error_comment(err: &TapError, raw: &str) -> String {
    format!(
        "<!-- Canonical transcoding failed: {} -->\n{raw}",
        comment_safe(&err.to_string())
    )
}

fn comment_header(operation: &str, endpoint: &str, direction: Direction) -> String {
    match direction {
        Direction::Request => format!(
            "<!-- Canonical Request for {}\nEndpoint: {}\n-->",
            comment_safe(operation),
            comment_safe(endpoint)
        ),
        Direction::Response => format!("<!-- Canonical Response for {} -->", comment_safe(operation)),
    }
}

// "--" is not allowed inside an XML comment.
fn comment_safe(s: &str) -> String {
    let mut out = s.to_string();
    while out.contains("--") {
        out = out.replace("--", "- -");
    }
    out
}

// Operation names come from headers; make them usable as an element name.
fn element_name(operation: &str) -> String {
    let mut name: String = operation
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    match name.chars().next() {
        None => name.push_str("Operation"),
        Some(c) if !(c.is_alphabetic() || c == '_') => name.insert(0, '_'),
        Some(_) => {}
    }
    name
}

type Declaration = (Vec<u8>, Vec<u8>);

/// Pieces of the original document the canonical envelope is built from.
#[derive(Debug)]
struct Extracted {
    namespace: Vec<u8>,
    /// Declarations in scope at the operation element (root and Body).
    inherited: Vec<Declaration>,
    /// The operation element's events, start to end.
    operation: Vec<Event<'static>>,
}

#[derive(Debug, PartialEq, Eq)]
enum BodyState {
    NotSeen,
    Inside,
    Done,
}

struct Scanner {
    depth: usize,
    root_seen: bool,
    namespace: Option<Vec<u8>>,
    inherited: Vec<Declaration>,
    body: BodyState,
    operation: Vec<Event<'static>>,
    capturing: bool,
}

impl Scanner {
    fn new() -> Self {
        Self {
            depth: 0,
            root_seen: false,
            namespace: None,
            inherited: Vec::new(),
            body: BodyState::NotSeen,
            operation: Vec::new(),
            capturing: false,
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, namespace: Option<Vec<u8>>, empty: bool) -> Result<()> {
        let level = self.depth + 1;
        if level == 1 {
            if self.root_seen {
                return Err(TapError::ParseFailure("multiple root elements".into()));
            }
            self.root_seen = true;
            self.namespace = namespace;
            self.inherit(e)?;
        } else if self.capturing {
            check_attributes(e)?;
            self.operation.push(owned_open(e, empty));
        } else if level == 2 && self.body == BodyState::NotSeen && e.local_name().as_ref() == b"Body" {
            self.body = if empty { BodyState::Done } else { BodyState::Inside };
            self.inherit(e)?;
        } else if level == 3 && self.body == BodyState::Inside && self.operation.is_empty() {
            check_attributes(e)?;
            self.operation.push(owned_open(e, empty));
            self.capturing = !empty;
        } else {
            check_attributes(e)?;
        }

        if !empty {
            self.depth = level;
        }
        Ok(())
    }

    fn close(&mut self, e: &BytesEnd<'_>) -> Result<()> {
        if self.depth == 0 {
            return Err(TapError::ParseFailure("unmatched end tag".into()));
        }
        if self.capturing {
            self.operation.push(Event::End(e.clone().into_owned()));
            if self.depth == 3 {
                self.capturing = false;
            }
        } else if self.depth == 2 && self.body == BodyState::Inside {
            self.body = BodyState::Done;
        }
        self.depth -= 1;
        Ok(())
    }

    fn content(&mut self, event: Event<'_>) {
        if self.capturing {
            self.operation.push(event.into_owned());
        }
    }

    fn inherit(&mut self, e: &BytesStart<'_>) -> Result<()> {
        for attr in e.attributes() {
            let attr = attr.map_err(|err| TapError::ParseFailure(err.to_string()))?;
            let key = attr.key.as_ref().to_vec();
            if is_declaration(&key) {
                self.inherited.retain(|(k, _)| *k != key);
                self.inherited.push((key, attr.value.into_owned()));
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Option<Extracted>> {
        if !self.root_seen {
            return Err(TapError::ParseFailure("document has no root element".into()));
        }
        if self.depth != 0 {
            return Err(TapError::ParseFailure("unexpected end of document".into()));
        }
        if self.operation.is_empty() {
            return Ok(None);
        }
        let namespace = self
            .namespace
            .ok_or_else(|| TapError::ShapeMismatch("envelope root element has no namespace".into()))?;
        Ok(Some(Extracted {
            namespace,
            inherited: self.inherited,
            operation: self.operation,
        }))
    }
}

fn owned_open(e: &BytesStart<'_>, empty: bool) -> Event<'static> {
    let e = e.clone().into_owned();
    if empty {
        Event::Empty(e)
    } else {
        Event::Start(e)
    }
}

fn check_attributes(e: &BytesStart<'_>) -> Result<()> {
    for attr in e.attributes() {
        attr.map_err(|err| TapError::ParseFailure(err.to_string()))?;
    }
    Ok(())
}

fn is_declaration(key: &[u8]) -> bool {
    key == b"xmlns" || key.starts_with(b"xmlns:")
}

fn prefix_of(name: &[u8]) -> Option<&[u8]> {
    name.iter().position(|&b| b == b':').map(|i| &name[..i])
}

fn declaration_key(prefix: Option<&[u8]>) -> Vec<u8> {
    match prefix {
        None => b"xmlns".to_vec(),
        Some(p) => [b"xmlns:".as_slice(), p].concat(),
    }
}

fn extract(raw: &str) -> Result<Option<Extracted>> {
    let mut reader = NsReader::from_str(raw);
    let mut scanner = Scanner::new();

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| TapError::ParseFailure(e.to_string()))?;
        let namespace = match resolved {
            ResolveResult::Bound(ns) => Some(ns.as_ref().to_vec()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(TapError::ParseFailure(format!(
                    "undeclared namespace prefix '{}'",
                    String::from_utf8_lossy(&prefix)
                )))
            }
        };

        match event {
            Event::Start(e) => scanner.open(&e, namespace, false)?,
            Event::Empty(e) => scanner.open(&e, namespace, true)?,
            Event::End(e) => scanner.close(&e)?,
            // Untrimmed; whitespace outside the operation is dropped by `content`.
            Event::Text(t) => {
                if scanner.depth == 0 && t.iter().any(|b| !b.is_ascii_whitespace()) {
                    return Err(TapError::ParseFailure("text outside the root element".into()));
                }
                scanner.content(Event::Text(t));
            }
            ev @ (Event::CData(_) | Event::Comment(_) | Event::PI(_)) => scanner.content(ev),
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    scanner.finish()
}

impl Extracted {
    /// Declarations the operation subtree uses but only inherited from its
    /// original ancestors.
    fn missing_declarations(&self) -> Vec<&Declaration> {
        let mut used: Vec<Vec<u8>> = Vec::new();
        let mut declared_on_op: Vec<Vec<u8>> = Vec::new();

        for (i, event) in self.operation.iter().enumerate() {
            let (Event::Start(e) | Event::Empty(e)) = event else {
                continue;
            };
            used.push(declaration_key(prefix_of(e.name().as_ref())));
            for attr in e.attributes().flatten() {
                let key = attr.key.as_ref();
                if is_declaration(key) {
                    if i == 0 {
                        declared_on_op.push(key.to_vec());
                    }
                } else if let Some(p) = prefix_of(key) {
                    if p != b"xml" {
                        used.push(declaration_key(Some(p)));
                    }
                }
            }
        }

        self.inherited
            .iter()
            .filter(|(k, v)| {
                if !used.contains(k) || declared_on_op.contains(k) {
                    return false;
                }
                let already_on_root = (k.as_slice() == b"xmlns:soapenv" && *v == self.namespace)
                    || (k.as_slice() == b"xmlns:tem" && v.as_slice() == AUX_NS.as_bytes());
                !already_on_root
            })
            .collect()
    }
}

fn render(extracted: &Extracted, operation: &str, endpoint: &str, direction: Direction) -> Result<String> {
    let mut root = BytesStart::new("soapenv:Envelope");
    root.push_attribute((b"xmlns:soapenv".as_slice(), extracted.namespace.as_slice()));
    root.push_attribute(("xmlns:tem", AUX_NS));
    let root = serialize([Event::Start(root)])?;

    let missing = extracted.missing_declarations();
    let body = serialize(extracted.operation.iter().enumerate().map(|(i, event)| match event {
        Event::Start(e) if i == 0 => Event::Start(with_declarations(e, &missing)),
        Event::Empty(e) if i == 0 => Event::Empty(with_declarations(e, &missing)),
        other => other.clone(),
    }))?;

    // Only the wrapper is laid out; the operation subtree is written as read.
    Ok(format!(
        "{DECLARATION}\n{comment}\n{root}\n  \
<soapenv:Header/>\n  \
<soapenv:Body>\n    \
{body}\n  \
</soapenv:Body>\n\
</soapenv:Envelope>",
        comment = comment_header(operation, endpoint, direction),
    ))
}

fn with_declarations(e: &BytesStart<'static>, declarations: &[&Declaration]) -> BytesStart<'static> {
    let mut e = e.clone();
    for (key, value) in declarations {
        e.push_attribute((key.as_slice(), value.as_slice()));
    }
    e
}

fn serialize<'a>(events: impl IntoIterator<Item = Event<'a>>) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer
            .write_event(event)
            .map_err(|e| TapError::ShapeMismatch(format!("failed to write envelope: {e}")))?;
    }
    String::from_utf8(writer.into_inner())
        .map_err(|e| TapError::ShapeMismatch(format!("rewritten envelope is not utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    const ADD_REQUEST: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><Add><a>1</a><b>2</b></Add></s:Body></s:Envelope>"#;

    #[test]
    fn wraps_single_operation() {
        let out = transcode(ADD_REQUEST, "Add", "http://host/Service1.svc", Direction::Request);
        assert!(out.starts_with(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- Canonical Request for Add\nEndpoint: http://host/Service1.svc\n-->\n"
        ));
        assert!(out.contains(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:tem="http://tempuri.org/">"#
        ));
        assert!(out.contains("<soapenv:Header/>"));
        assert!(out.contains("<a>1</a>"));
        assert!(out.contains("<b>2</b>"));
        assert!(out.ends_with("</soapenv:Envelope>"));
    }

    #[test]
    fn response_comment_omits_endpoint() {
        let out = transcode(ADD_REQUEST, "Add", "http://host/Service1.svc", Direction::Response);
        assert!(out.contains("<!-- Canonical Response for Add -->"));
        assert!(!out.contains("Endpoint:"));
    }

    #[test]
    fn unparsable_request_becomes_template() {
        let out = transcode("<Add><a>1</a>", "Add", "http://host/x", Direction::Request);
        assert_eq!(out, request_template("Add", "http://host/x"));
        assert!(out.contains("<tem:Add>"));
    }

    #[test]
    fn unparsable_response_is_verbatim() {
        let raw = "not xml at all";
        assert_eq!(transcode(raw, "Add", "http://host/x", Direction::Response), raw);
    }

    #[test]
    fn missing_body_falls_back() {
        let raw = r#"<s:Envelope xmlns:s="urn:e"><s:Header/></s:Envelope>"#;
        assert_eq!(transcode(raw, "Op", "e", Direction::Response), raw);
        assert_eq!(transcode(raw, "Op", "e", Direction::Request), request_template("Op", "e"));

        let empty_body = r#"<s:Envelope xmlns:s="urn:e"><s:Body/></s:Envelope>"#;
        assert_eq!(transcode(empty_body, "Op", "e", Direction::Response), empty_body);
    }

    #[test]
    fn root_without_namespace_gets_error_comment() {
        let raw = "<Envelope><Body><Add/></Body></Envelope>";
        let out = transcode(raw, "Add", "e", Direction::Request);
        assert!(out.starts_with("<!-- Canonical transcoding failed:"));
        assert!(out.ends_with(raw));
    }

    #[test]
    fn sibling_operations_are_dropped() {
        let raw = r#"<s:Envelope xmlns:s="urn:e"><s:Body><First/><Second/></s:Body></s:Envelope>"#;
        let out = transcode(raw, "First", "e", Direction::Response);
        assert!(out.contains("<First/>"));
        assert!(!out.contains("Second"));
    }

    #[test]
    fn inherited_prefix_is_redeclared() {
        let raw = r#"<s:Envelope xmlns:s="urn:e" xmlns:ord="urn:orders"><s:Body><ord:Place><ord:id>7</ord:id></ord:Place></s:Body></s:Envelope>"#;
        let out = transcode(raw, "Place", "e", Direction::Request);
        assert!(out.contains(r#"<ord:Place xmlns:ord="urn:orders">"#));
        assert!(out.contains("<ord:id>7</ord:id>"));
    }

    #[test]
    fn comment_text_is_sanitised() {
        let out = request_template("Add", "http://host/a--b");
        assert!(out.contains("Endpoint: http://host/a- -b"));
    }

    #[test]
    fn template_element_name_is_valid() {
        assert_eq!(element_name("Add"), "Add");
        assert_eq!(element_name("9lives"), "_9lives");
        assert_eq!(element_name("a b"), "a_b");
        assert_eq!(element_name(""), "Operation");
    }

    #[test]
    fn operation_text_is_not_trimmed() {
        let raw = r#"<s:Envelope xmlns:s="urn:e"><s:Body><Echo><msg>  padded  </msg><sep> </sep></Echo></s:Body></s:Envelope>"#;
        let out = transcode(raw, "Echo", "e", Direction::Response);
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<!-- Canonical Response for Echo -->\n\
<soapenv:Envelope xmlns:soapenv=\"urn:e\" xmlns:tem=\"http://tempuri.org/\">\n  \
<soapenv:Header/>\n  \
<soapenv:Body>\n    \
<Echo><msg>  padded  </msg><sep> </sep></Echo>\n  \
</soapenv:Body>\n\
</soapenv:Envelope>"
        );
    }

    #[test]
    fn transcoding_is_idempotent() {
        let once = transcode(ADD_REQUEST, "Add", "http://host/s", Direction::Request);
        let twice = transcode(&once, "Add", "http://host/s", Direction::Request);
        assert_eq!(once, twice);
    }
}
