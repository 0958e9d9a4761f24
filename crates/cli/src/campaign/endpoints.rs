//! Demo endpoints served by the in-process gateway.
//!
//! Requests and replies are JSON; the handlers mimic a small remote
//! service that processes a string and reports its size.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use contracts::{EndpointKind, GatewaySettings};
use gateway::{EndpointHandler, FaultProfile, InProcessGateway};

/// Request payload sent to every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDto {
    /// Dispatch index within the batch.
    pub index: usize,
    /// String for the endpoint to process.
    pub body: String,
}

/// Reply payload produced by the endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyDto {
    /// Processed request body.
    pub result: String,
    /// Character count of `result`.
    pub num_chars: usize,
}

/// Handler for a built-in endpoint kind.
fn handler_for(kind: EndpointKind) -> EndpointHandler {
    Arc::new(move |payload: &Bytes| {
        let request: RequestDto =
            serde_json::from_slice(payload).map_err(|e| format!("malformed request: {e}"))?;

        let result = match kind {
            EndpointKind::Echo => request.body,
            EndpointKind::Uppercase => request.body.to_uppercase(),
        };

        let reply = ReplyDto {
            num_chars: result.chars().count(),
            result,
        };
        let encoded = serde_json::to_vec(&reply).map_err(|e| format!("encode failed: {e}"))?;
        Ok(Bytes::from(encoded))
    })
}

/// Build an [`InProcessGateway`] from configuration.
pub fn build_gateway(settings: &GatewaySettings) -> InProcessGateway {
    let mut gw = InProcessGateway::new()
        .with_latency(
            Duration::from_millis(settings.latency_min_ms),
            Duration::from_millis(settings.latency_max_ms),
        )
        .with_faults(FaultProfile {
            reject_rate: settings.reject_rate,
            failure_rate: settings.failure_rate,
            drop_rate: settings.drop_rate,
        });

    for endpoint in &settings.endpoints {
        gw.register(endpoint.id.clone(), handler_for(endpoint.kind));
    }

    gw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_handler_round_trip() {
        let handler = handler_for(EndpointKind::Echo);
        let payload = Bytes::from(
            serde_json::json!({ "index": 3, "body": "hello fanout" }).to_string(),
        );

        let reply = handler(&payload).unwrap();
        let decoded: ReplyDto = serde_json::from_slice(&reply).unwrap();
        assert_eq!(decoded.result, "hello fanout");
        assert_eq!(decoded.num_chars, 12);
    }

    #[test]
    fn test_uppercase_handler() {
        let handler = handler_for(EndpointKind::Uppercase);
        let payload = Bytes::from(serde_json::json!({ "index": 0, "body": "abc" }).to_string());

        let reply = handler(&payload).unwrap();
        let decoded: ReplyDto = serde_json::from_slice(&reply).unwrap();
        assert_eq!(decoded.result, "ABC");
    }

    #[test]
    fn test_malformed_request_fails() {
        let handler = handler_for(EndpointKind::Echo);
        let err = handler(&Bytes::from_static(b"not json")).unwrap_err();
        assert!(err.contains("malformed request"));
    }
}
