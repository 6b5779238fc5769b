//! Host-side extension points: endpoint dispatchers and the inspector hook.
//!
//! A host owns one `EndpointDispatcher` per listening address. Inspectors are
//! registered before the endpoint opens and run, in registration order, on
//! every inbound request and outbound reply.

use std::any::Any;
use std::sync::Arc;

use soaptap_core::error::{Result, TapError};
use soaptap_core::Message;

/// Per-call value returned by the request hook and handed back, untouched,
/// to the reply hook of the same inspector.
pub type CallState = Box<dyn Any + Send>;

pub trait MessageInspector: Send + Sync {
    /// Called after a request is received. May replace `request`.
    fn after_receive_request(&self, request: &mut Message) -> Option<CallState>;

    /// Called before the reply is sent, with whatever the request hook
    /// returned for this call. May replace `reply`.
    fn before_send_reply(&self, reply: &mut Message, state: Option<CallState>);
}

pub struct EndpointDispatcher {
    address: String,
    inspectors: Vec<Arc<dyn MessageInspector>>,
    opened: bool,
}

impl EndpointDispatcher {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            inspectors: Vec::new(),
            opened: false,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    pub fn inspector_count(&self) -> usize {
        self.inspectors.len()
    }

    pub fn add_inspector(&mut self, inspector: Arc<dyn MessageInspector>) -> Result<()> {
        if self.opened {
            return Err(TapError::Registration(format!(
                "endpoint {} is already open",
                self.address
            )));
        }
        self.inspectors.push(inspector);
        Ok(())
    }

    /// Freeze the inspector list.
    pub fn open(&mut self) {
        self.opened = true;
    }

    /// Run every inspector's request hook. The returned states line up with
    /// the inspectors and must be passed to [`before_send_reply`](Self::before_send_reply).
    pub fn after_receive_request(&self, request: &mut Message) -> Vec<Option<CallState>> {
        self.inspectors
            .iter()
            .map(|inspector| inspector.after_receive_request(request))
            .collect()
    }

    pub fn before_send_reply(&self, reply: &mut Message, states: Vec<Option<CallState>>) {
        let mut states = states.into_iter();
        for inspector in &self.inspectors {
            inspector.before_send_reply(reply, states.next().flatten());
        }
    }
}

/// Everything a host exposes to attach-time extensions.
#[derive(Default)]
pub struct HostDescriptor {
    endpoints: Vec<EndpointDispatcher>,
}

impl HostDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: EndpointDispatcher) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn endpoints(&self) -> &[EndpointDispatcher] {
        &self.endpoints
    }

    pub fn endpoints_mut(&mut self) -> &mut [EndpointDispatcher] {
        &mut self.endpoints
    }

    pub fn open_all(&mut self) {
        for endpoint in &mut self.endpoints {
            endpoint.open();
        }
    }

    pub fn into_endpoints(self) -> Vec<EndpointDispatcher> {
        self.endpoints
    }
}
