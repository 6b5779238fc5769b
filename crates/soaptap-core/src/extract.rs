//! Label extractors with layered fallbacks.
//!
//! Both functions are total: malformed or missing metadata degrades to the
//! next fallback and finally to a sentinel, so labeling never blocks capture.

use crate::message::Message;

/// Returned when neither the action nor the destination yields a name.
pub const UNKNOWN_OPERATION: &str = "UnknownOperation";

/// Returned when the destination address is missing or unreadable.
pub const DEFAULT_ENDPOINT: &str = "http://localhost/Service";

/// Operation name: last `/` segment of the action, else last path segment of
/// the destination, else [`UNKNOWN_OPERATION`].
pub fn operation_name(message: &Message) -> String {
    let headers = message.headers();

    if let Ok(Some(action)) = headers.action() {
        if let Some(last) = action.trim().rsplit('/').next().filter(|s| !s.is_empty()) {
            return last.to_string();
        }
    }

    if let Ok(Some(to)) = headers.to() {
        if let Some(last) = last_path_segment(to) {
            return last.to_string();
        }
    }

    UNKNOWN_OPERATION.to_string()
}

/// Destination address as given, else [`DEFAULT_ENDPOINT`].
pub fn endpoint_url(message: &Message) -> String {
    match message.headers().to() {
        Ok(Some(to)) if !to.trim().is_empty() => to.trim().to_string(),
        _ => DEFAULT_ENDPOINT.to_string(),
    }
}

fn last_path_segment(address: &str) -> Option<&str> {
    let address = address.trim();
    let without_scheme = match address.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, path)| path).unwrap_or(""),
        None => address,
    };
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);
    path.split('/').rev().find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::message::Headers;

    fn msg(headers: Headers) -> Message {
        Message::from_bytes(headers, "")
    }

    #[test]
    fn action_last_segment_wins() {
        let m = msg(Headers::new()
            .with_action("http://tempuri.org/IService1/Add")
            .with_to("http://host/Service1.svc"));
        assert_eq!(operation_name(&m), "Add");
    }

    #[test]
    fn action_without_slash_is_the_name() {
        let m = msg(Headers::new().with_action("Ping"));
        assert_eq!(operation_name(&m), "Ping");
    }

    #[test]
    fn falls_back_to_destination_path() {
        let m = msg(Headers::new().with_to("http://host:8080/svc/Service1.svc?wsdl"));
        assert_eq!(operation_name(&m), "Service1.svc");

        let trailing = msg(Headers::new()
            .with_action("urn:ops/")
            .with_to("http://host/Calc/"));
        assert_eq!(operation_name(&trailing), "Calc");
    }

    #[test]
    fn sentinels_when_nothing_usable() {
        let empty = msg(Headers::new());
        assert_eq!(operation_name(&empty), UNKNOWN_OPERATION);
        assert_eq!(endpoint_url(&empty), DEFAULT_ENDPOINT);

        let host_only = msg(Headers::new().with_to("http://host"));
        assert_eq!(operation_name(&host_only), UNKNOWN_OPERATION);
        assert_eq!(endpoint_url(&host_only), "http://host");
    }

    #[test]
    fn malformed_metadata_never_fails() {
        let bad = msg(Headers::new()
            .with_action(vec![0xc3, 0x28])
            .with_to(vec![0xff]));
        assert_eq!(operation_name(&bad), UNKNOWN_OPERATION);
        assert_eq!(endpoint_url(&bad), DEFAULT_ENDPOINT);

        let bad_action = msg(Headers::new()
            .with_action(vec![0xff])
            .with_to("http://host/Orders.svc"));
        assert_eq!(operation_name(&bad_action), "Orders.svc");
    }
}
