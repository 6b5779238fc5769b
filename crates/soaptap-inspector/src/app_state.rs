//! Shared application state for the demo host.
//!
//! Registers the bundled services, gives each one an endpoint, attaches the
//! interceptor to every endpoint and then opens them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::{Dispatcher, SoapService};
use crate::host::{EndpointDispatcher, HostDescriptor};
use crate::obs::InterceptorMetrics;
use crate::pipeline::Interceptor;
use crate::services::CalculatorService;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    interceptor: Arc<Interceptor>,
    endpoints: HashMap<String, Arc<EndpointDispatcher>>,
}

impl AppState {
    pub fn new(interceptor: Arc<Interceptor>) -> Self {
        Self::with_services(interceptor, vec![Arc::new(CalculatorService::new())])
    }

    pub fn with_services(interceptor: Arc<Interceptor>, services: Vec<Arc<dyn SoapService>>) -> Self {
        let dispatcher = Dispatcher::new();
        let mut host = HostDescriptor::new();
        for svc in services {
            host = host.with_endpoint(EndpointDispatcher::new(svc.name()));
            dispatcher.register(svc);
        }

        let attached = interceptor.attach(&mut host);
        host.open_all();
        tracing::info!(attached, services = ?dispatcher.registered(), "endpoints opened");

        let endpoints = host
            .into_endpoints()
            .into_iter()
            .map(|ep| (ep.address().to_string(), Arc::new(ep)))
            .collect();

        Self {
            inner: Arc::new(AppStateInner { interceptor, endpoints }),
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn interceptor(&self) -> Arc<Interceptor> {
        Arc::clone(&self.inner.interceptor)
    }

    pub fn metrics(&self) -> Arc<InterceptorMetrics> {
        self.inner.interceptor.metrics()
    }

    pub fn endpoint(&self, service: &str) -> Option<Arc<EndpointDispatcher>> {
        self.inner.endpoints.get(service).cloned()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }
}
