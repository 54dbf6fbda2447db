//! DeviceLink: the single path every device command takes.
//!
//! A [`DeviceLink`] owns a transport and turns one [`Request`] into one
//! checked result.  For each call it:
//!
//! 1. opens a fresh channel (closed again when the call returns, on every
//!    path including errors),
//! 2. sends the envelope and receives the unwrapped result,
//! 3. classifies the result:
//!
//! ```text
//! None                                   -> Ok(None)   (UDP, fire-and-forget)
//! "module not support"                   -> UnsupportedModule(namespace)
//! {"err_code": 0, ...}                   -> Ok(Some({...}))  err_code stripped
//! {"err_code": 5, "err_msg": "busy"}     -> Device { code: 5, message: "busy" }
//! {...} without err_code, or non-object  -> MalformedEnvelope
//! ```
//!
//! Capability code never sees a half-checked reply.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use smartlight_core::protocol::envelope::{ERR_CODE, ERR_MSG};
use smartlight_core::protocol::namespace_of;
use smartlight_core::{DeviceIdentity, ProtocolError, Request};
use tracing::debug;

use crate::error::LinkError;
use crate::infrastructure::transport::{Endpoint, Transport};

/// What a device answers for a namespace it does not implement.
pub const UNSUPPORTED_MODULE: &str = "module not support";

/// A transport plus the result-checking rules.
///
/// Cloning shares the transport.  Two links are equal when their transports
/// talk to the same endpoint.
#[derive(Clone)]
pub struct DeviceLink {
    transport: Arc<dyn Transport>,
}

impl DeviceLink {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.transport.endpoint()
    }

    /// Sends `request` and returns the checked result.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`LinkError`], or the classification errors
    /// listed in the module docs.
    pub async fn send(&self, request: &Request) -> Result<Option<Map<String, Value>>, LinkError> {
        self.send_value(&request.to_value()).await
    }

    /// Like [`DeviceLink::send`] for an already-built envelope.
    pub async fn send_value(
        &self,
        envelope: &Value,
    ) -> Result<Option<Map<String, Value>>, LinkError> {
        let namespace = namespace_of(envelope).unwrap_or_default().to_string();

        let mut channel = self.transport.open().await?;
        let reply = channel.send(envelope).await?;
        drop(channel);

        match reply {
            None => Ok(None),
            Some(result) => check_result(&namespace, result).map(Some),
        }
    }
}

impl PartialEq for DeviceLink {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint() == other.endpoint()
    }
}

impl fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLink")
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

/// Applies the `err_code` rules to an unwrapped result.
pub(crate) fn check_result(namespace: &str, result: Value) -> Result<Map<String, Value>, LinkError> {
    let mut map = match result {
        Value::Object(map) => map,
        Value::String(s) if s == UNSUPPORTED_MODULE => {
            return Err(LinkError::UnsupportedModule(namespace.to_string()))
        }
        other => {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "{namespace} result is not an object: {other}"
            ))
            .into())
        }
    };

    let message = map
        .get(ERR_MSG)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if message == UNSUPPORTED_MODULE {
        return Err(LinkError::UnsupportedModule(namespace.to_string()));
    }

    let code = match map.remove(ERR_CODE) {
        Some(code) => code.as_i64().ok_or_else(|| {
            ProtocolError::MalformedEnvelope(format!("{namespace} err_code is not an integer"))
        })?,
        None => {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "{namespace} result has no err_code"
            ))
            .into())
        }
    };

    if code != 0 {
        debug!("{namespace} failed with err_code {code}: {message}");
        return Err(LinkError::Device { code, message });
    }
    Ok(map)
}

/// A device found by a discovery scan or the cloud device list.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub identity: DeviceIdentity,
    pub link: DeviceLink,
    /// 1-based position in the scan that produced this device.
    pub ordinal: usize,
    /// The raw `get_sysinfo` result (LAN) or device-list entry (cloud).
    pub sysinfo: Value,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::infrastructure::transport::testing::ScriptedTransport;
    use crate::infrastructure::transport::{Channel, LocalTcp, MockChannel};

    /// Hands out one pre-programmed mock channel.
    struct MockTransport {
        channel: Mutex<Option<MockChannel>>,
    }

    impl MockTransport {
        fn with(channel: MockChannel) -> Self {
            Self {
                channel: Mutex::new(Some(channel)),
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self) -> Result<Box<dyn Channel>, LinkError> {
            let channel = self.channel.lock().unwrap().take().expect("opened once");
            Ok(Box::new(channel))
        }

        fn endpoint(&self) -> Endpoint {
            Endpoint::Udp("127.0.0.1:9999".parse().unwrap())
        }
    }

    fn sysinfo_request() -> Request {
        Request::new("system", "get_sysinfo")
    }

    #[tokio::test]
    async fn test_success_strips_err_code() {
        // Arrange
        let mut channel = MockChannel::new();
        channel
            .expect_send()
            .withf(|req| req == &json!({"system": {"get_sysinfo": null}}))
            .times(1)
            .returning(|_| Ok(Some(json!({"err_code": 0, "alias": "desk"}))));
        let link = DeviceLink::new(MockTransport::with(channel));

        // Act
        let result = link.send(&sysinfo_request()).await.unwrap().unwrap();

        // Assert
        assert_eq!(Value::Object(result), json!({"alias": "desk"}));
    }

    #[tokio::test]
    async fn test_non_zero_err_code_is_device_error() {
        // Arrange
        let mut channel = MockChannel::new();
        channel
            .expect_send()
            .returning(|_| Ok(Some(json!({"err_code": 5, "err_msg": "busy"}))));
        let link = DeviceLink::new(MockTransport::with(channel));

        // Act
        let err = link.send(&sysinfo_request()).await.unwrap_err();

        // Assert
        assert!(matches!(
            err,
            LinkError::Device { code: 5, ref message } if message == "busy"
        ));
    }

    #[tokio::test]
    async fn test_no_reply_passes_through_as_none() {
        let mut channel = MockChannel::new();
        channel.expect_send().returning(|_| Ok(None));
        let link = DeviceLink::new(MockTransport::with(channel));

        let result = link.send(&sysinfo_request()).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_sentinel_string_is_unsupported_module() {
        // Arrange
        let transport = ScriptedTransport::new().reply_ok(json!(UNSUPPORTED_MODULE));
        let link = DeviceLink::new(transport);

        // Act
        let err = link
            .send(&Request::new("smartlife.iot.common.emeter", "get_realtime"))
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            LinkError::UnsupportedModule(ref ns) if ns == "smartlife.iot.common.emeter"
        ));
    }

    #[tokio::test]
    async fn test_sentinel_err_msg_is_unsupported_module() {
        let transport = ScriptedTransport::new()
            .reply_ok(json!({"err_code": -1, "err_msg": "module not support"}));
        let link = DeviceLink::new(transport);

        let err = link.send(&Request::new("schedule", "get_rules")).await.unwrap_err();

        assert!(matches!(err, LinkError::UnsupportedModule(ref ns) if ns == "schedule"));
    }

    #[tokio::test]
    async fn test_missing_err_code_is_malformed() {
        let transport = ScriptedTransport::new().reply_ok(json!({"alias": "desk"}));
        let link = DeviceLink::new(transport);

        let err = link.send(&sysinfo_request()).await.unwrap_err();

        assert!(matches!(
            err,
            LinkError::Protocol(ProtocolError::MalformedEnvelope(_))
        ));
    }

    #[tokio::test]
    async fn test_non_object_result_is_malformed() {
        let transport = ScriptedTransport::new().reply_ok(json!(42));
        let link = DeviceLink::new(transport);

        let err = link.send(&sysinfo_request()).await.unwrap_err();

        assert!(matches!(
            err,
            LinkError::Protocol(ProtocolError::MalformedEnvelope(_))
        ));
    }

    #[tokio::test]
    async fn test_channel_is_closed_after_success_and_error() {
        // Arrange
        let transport = ScriptedTransport::new()
            .reply_ok(json!({"err_code": 0}))
            .reply(Err(LinkError::Timeout(std::time::Duration::from_millis(5))));
        let link = DeviceLink::new(transport.clone());

        // Act
        let first = link.send(&sysinfo_request()).await;
        let second = link.send(&sysinfo_request()).await;

        // Assert
        assert!(first.is_ok());
        assert!(second.unwrap_err().is_timeout());
        assert_eq!(transport.opened(), 2);
        assert_eq!(transport.closed(), 2);
    }

    #[tokio::test]
    async fn test_every_send_opens_a_new_channel() {
        let transport = ScriptedTransport::new()
            .reply_ok(json!({"err_code": 0}))
            .reply_ok(json!({"err_code": 0}));
        let link = DeviceLink::new(transport.clone());

        link.send(&sysinfo_request()).await.unwrap();
        link.send(&Request::new("system", "reboot")).await.unwrap();

        assert_eq!(transport.opened(), 2);
        assert_eq!(
            transport.requests()[1],
            json!({"system": {"reboot": null}})
        );
    }

    #[test]
    fn test_links_compare_by_endpoint() {
        let ip = "192.168.0.7".parse().unwrap();
        let a = DeviceLink::new(LocalTcp::new(ip));
        let b = DeviceLink::new(LocalTcp::new(ip).with_timeout(std::time::Duration::from_secs(2)));
        let c = DeviceLink::new(LocalTcp::new("192.168.0.8".parse().unwrap()));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
