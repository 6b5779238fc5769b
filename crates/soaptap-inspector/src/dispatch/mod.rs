//! Service registry for the demo host.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, ServiceFault, SoapService};
