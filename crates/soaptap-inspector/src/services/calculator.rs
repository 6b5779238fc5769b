use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;

use soaptap_core::canonical::{AUX_NS, SOAP_ENVELOPE_NS};
use soaptap_core::{Headers, Message};

use crate::dispatch::{ServiceFault, SoapService};

/// Integer calculator exposing `Add`, `Subtract`, `Multiply` and `Divide`,
/// each taking `<a>` and `<b>`.
#[derive(Debug, Default)]
pub struct CalculatorService;

impl CalculatorService {
    pub const NAME: &'static str = "Service1.svc";

    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Default)]
struct Call {
    operation: String,
    a: Option<String>,
    b: Option<String>,
}

#[async_trait]
impl SoapService for CalculatorService {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn invoke(&self, mut request: Message) -> Result<Message, ServiceFault> {
        let body = request
            .read_text()
            .map_err(|e| ServiceFault::Server(format!("request unreadable: {e}")))?;
        let call = parse_call(&body)?;
        let a = operand("a", call.a.as_deref())?;
        let b = operand("b", call.b.as_deref())?;

        let result = match call.operation.as_str() {
            "Add" => a.checked_add(b),
            "Subtract" => a.checked_sub(b),
            "Multiply" => a.checked_mul(b),
            "Divide" => {
                if b == 0 {
                    return Err(ServiceFault::Client("division by zero".into()));
                }
                a.checked_div(b)
            }
            other => return Err(ServiceFault::Client(format!("unknown operation: {other}"))),
        }
        .ok_or_else(|| ServiceFault::Client(format!("{} overflows", call.operation)))?;

        tracing::debug!(operation = %call.operation, a, b, result, "calculator call");
        Ok(Message::from_bytes(Headers::new(), response_envelope(&call.operation, result)))
    }
}

fn operand(name: &str, value: Option<&str>) -> Result<i64, ServiceFault> {
    let value = value.ok_or_else(|| ServiceFault::Client(format!("missing operand <{name}>")))?;
    value
        .trim()
        .parse()
        .map_err(|_| ServiceFault::Client(format!("operand <{name}> is not an integer: {value}")))
}

/// First element inside `Body` is the operation; its `a`/`b` children are
/// the operands.
fn parse_call(xml: &str) -> Result<Call, ServiceFault> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut body_depth = None;
    let mut call: Option<Call> = None;
    let mut field: Option<&'static str> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ServiceFault::Client(format!("malformed request: {e}")))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                let local = e.local_name();
                match (body_depth, call.as_ref()) {
                    (None, _) if local.as_ref() == b"Body" => body_depth = Some(depth),
                    (Some(d), None) if depth == d + 1 => {
                        call = Some(Call {
                            operation: String::from_utf8_lossy(local.as_ref()).into_owned(),
                            ..Call::default()
                        });
                    }
                    (Some(d), Some(_)) if depth == d + 2 => {
                        field = match local.as_ref() {
                            b"a" => Some("a"),
                            b"b" => Some("b"),
                            _ => None,
                        };
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if let (Some(d), None) = (body_depth, call.as_ref()) {
                    if depth == d {
                        call = Some(Call {
                            operation: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                            ..Call::default()
                        });
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(name), Some(call)) = (field, call.as_mut()) {
                    let text = t
                        .unescape()
                        .map_err(|e| ServiceFault::Client(format!("malformed request: {e}")))?
                        .into_owned();
                    match name {
                        "a" => call.a = Some(text),
                        _ => call.b = Some(text),
                    }
                }
            }
            Event::End(_) => {
                field = None;
                if body_depth == Some(depth) {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    call.ok_or_else(|| ServiceFault::Client("request has no operation element".into()))
}

fn response_envelope(operation: &str, result: i64) -> String {
    format!(
        concat!(
            r#"<s:Envelope xmlns:s="{ns}"><s:Body>"#,
            r#"<{op}Response xmlns="{aux}"><{op}Result>{result}</{op}Result></{op}Response>"#,
            "</s:Body></s:Envelope>"
        ),
        ns = SOAP_ENVELOPE_NS,
        aux = AUX_NS,
        op = operation,
        result = result,
    )
}
