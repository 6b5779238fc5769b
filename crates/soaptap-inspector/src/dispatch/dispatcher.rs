use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use soaptap_core::canonical::SOAP_ENVELOPE_NS;
use soaptap_core::{Headers, Message};

/// SOAP fault raised by a service. Rendered as a fault envelope.
#[derive(Debug, Error)]
pub enum ServiceFault {
    /// Caller sent something the service cannot act on.
    #[error("{0}")]
    Client(String),
    #[error("{0}")]
    Server(String),
}

impl ServiceFault {
    /// SOAP 1.1 fault code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceFault::Client(_) => "soap:Client",
            ServiceFault::Server(_) => "soap:Server",
        }
    }

    pub fn to_envelope(&self) -> String {
        format!(
            concat!(
                r#"<soap:Envelope xmlns:soap="{ns}">"#,
                "<soap:Body><soap:Fault>",
                "<faultcode>{code}</faultcode>",
                "<faultstring>{text}</faultstring>",
                "</soap:Fault></soap:Body></soap:Envelope>"
            ),
            ns = SOAP_ENVELOPE_NS,
            code = self.code(),
            text = escape_text(&self.to_string()),
        )
    }

    pub fn into_message(self) -> Message {
        Message::from_bytes(Headers::new(), self.to_envelope())
    }
}

pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// A SOAP service hosted at `/{name}`.
#[async_trait]
pub trait SoapService: Send + Sync {
    fn name(&self) -> &'static str;
    async fn invoke(&self, request: Message) -> Result<Message, ServiceFault>;
}

/// Registry of hosted services, keyed by name.
#[derive(Default)]
pub struct Dispatcher {
    services: DashMap<&'static str, Arc<dyn SoapService>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    pub fn register(&self, svc: Arc<dyn SoapService>) {
        self.services.insert(svc.name(), svc);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SoapService>> {
        self.services.get(name).map(|e| e.value().clone())
    }

    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.services.iter().map(|e| *e.key()).collect();
        names.sort_unstable();
        names
    }
}
