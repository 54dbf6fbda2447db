//! HTTPS cloud relay.
//!
//! Devices bound to a cloud account can be reached from anywhere through the
//! vendor API.  Every call is a JSON-RPC style POST to one endpoint:
//!
//! ```text
//! POST https://wap.tplinkcloud.com/?token=<token>
//! {"method": "passthrough", "params": {"deviceId": "...", "requestData": "<envelope JSON text>"}}
//!
//! {"error_code": 0, "result": {"responseData": "<envelope JSON text>"}}
//! ```
//!
//! The device's own envelope travels as a JSON *string* inside the relay's
//! JSON, so the response is parsed twice before [`unwrap`] applies.  A
//! non-zero outer `error_code` is reported as [`LinkError::CloudApi`] and the
//! inner payload is never looked at.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use smartlight_core::{protocol::unwrap, to_wire_json, CloudDeviceEntry, ProtocolError};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Channel, Endpoint, Transport};
use crate::error::LinkError;

/// Vendor cloud API root.
pub const DEFAULT_CLOUD_ENDPOINT: &str = "https://wap.tplinkcloud.com";

/// Application type reported on login.
pub const DEFAULT_APP_TYPE: &str = "Kasa_Android";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Login parameters as the API expects them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginParams<'a> {
    app_type: &'a str,
    cloud_user_name: &'a str,
    cloud_password: &'a str,
    #[serde(rename = "terminalUUID")]
    terminal_uuid: String,
}

/// Thin client for the cloud JSON API.
///
/// Cloning is cheap; clones share the HTTP connection pool of `reqwest`.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    app_type: String,
    terminal_uuid: Uuid,
}

impl CloudClient {
    /// Creates a client for `endpoint` with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Http`] if the TLS backend cannot be initialised.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, LinkError> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LinkError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: None,
            app_type: DEFAULT_APP_TYPE.to_string(),
            terminal_uuid: Uuid::new_v4(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_app_type(mut self, app_type: impl Into<String>) -> Self {
        self.app_type = app_type.into();
        self
    }

    pub fn with_terminal_uuid(mut self, terminal_uuid: Uuid) -> Self {
        self.terminal_uuid = terminal_uuid;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Calls `method` and returns the `result` object of a successful reply.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Http`] on network or HTTP failures and
    /// [`LinkError::CloudApi`] when the reply carries a non-zero `error_code`.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, LinkError> {
        let mut body = json!({ "method": method });
        if let Some(params) = params {
            body["params"] = params;
        }

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.query(&[("token", token)]);
        }

        debug!("cloud call {method}");
        let reply: Value = request.send().await?.error_for_status()?.json().await?;
        parse_cloud_response(reply)
    }

    /// Logs in and keeps the returned token for subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::CloudApi`] for rejected credentials and
    /// [`LinkError::Protocol`] if the reply has no token.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String, LinkError> {
        let params = LoginParams {
            app_type: &self.app_type,
            cloud_user_name: username,
            cloud_password: password,
            terminal_uuid: self.terminal_uuid.to_string(),
        };
        let result = self.call("login", Some(serde_json::to_value(params)?)).await?;
        let token = result
            .get("token")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("token"))?
            .to_string();

        info!("logged in to cloud as {username}");
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Lists the devices bound to the account.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Configuration`] without a token, otherwise the
    /// errors of [`CloudClient::call`].
    pub async fn device_list(&self) -> Result<Vec<CloudDeviceEntry>, LinkError> {
        self.require_token()?;
        let result = self.call("getDeviceList", None).await?;
        let list = result
            .get("deviceList")
            .cloned()
            .ok_or(ProtocolError::MissingField("deviceList"))?;
        Ok(serde_json::from_value(list)?)
    }

    /// Forwards `request` to `device_id` and returns the unwrapped result.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Configuration`] without a token, and
    /// [`LinkError::Protocol`] if `responseData` is missing or malformed.
    pub async fn passthrough(&self, device_id: &str, request: &Value) -> Result<Value, LinkError> {
        self.require_token()?;
        let params = json!({
            "deviceId": device_id,
            "requestData": to_wire_json(request),
        });
        let result = self.call("passthrough", Some(params)).await?;
        parse_passthrough_result(result)
    }

    fn require_token(&self) -> Result<&str, LinkError> {
        self.token()
            .ok_or_else(|| LinkError::Configuration("cloud token is not set".to_string()))
    }
}

/// Checks the outer `error_code` and returns `result`.
pub(crate) fn parse_cloud_response(mut reply: Value) -> Result<Value, LinkError> {
    let code = reply.get("error_code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let message = reply
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(LinkError::CloudApi { code, message });
    }
    Ok(reply.get_mut("result").map(Value::take).unwrap_or(Value::Null))
}

/// Decodes the JSON string in `responseData` and unwraps the envelope.
pub(crate) fn parse_passthrough_result(result: Value) -> Result<Value, LinkError> {
    let data = result
        .get("responseData")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("responseData"))?;
    let envelope: Value = serde_json::from_str(data)?;
    Ok(unwrap(envelope)?)
}

// ── Relay transport ───────────────────────────────────────────────────────────

/// A device reached through the cloud `passthrough` call.
#[derive(Debug, Clone)]
pub struct CloudRelay {
    client: CloudClient,
    device_id: Option<String>,
}

impl CloudRelay {
    pub fn new(client: CloudClient) -> Self {
        Self {
            client,
            device_id: None,
        }
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn client(&self) -> &CloudClient {
        &self.client
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
}

#[async_trait]
impl Transport for CloudRelay {
    /// No socket is held between calls; the session only captures settings.
    async fn open(&self) -> Result<Box<dyn Channel>, LinkError> {
        Ok(Box::new(CloudChannel {
            client: self.client.clone(),
            device_id: self.device_id.clone(),
        }))
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Cloud {
            device_id: self.device_id.clone(),
            token: self.client.token.clone(),
        }
    }
}

struct CloudChannel {
    client: CloudClient,
    device_id: Option<String>,
}

#[async_trait]
impl Channel for CloudChannel {
    async fn send(&mut self, request: &Value) -> Result<Option<Value>, LinkError> {
        let device_id = self.device_id.as_deref().ok_or_else(|| {
            LinkError::Configuration("cloud relay requires a device id".to_string())
        })?;
        if self.client.token().is_none() {
            return Err(LinkError::Configuration(
                "cloud relay requires a token".to_string(),
            ));
        }
        let result = self.client.passthrough(device_id, request).await?;
        Ok(Some(result))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CloudClient {
        CloudClient::new("http://127.0.0.1:1").expect("client builds")
    }

    #[test]
    fn test_error_code_surfaces_as_cloud_api_error() {
        // Arrange
        let reply = json!({"error_code": 1, "msg": "token expired"});

        // Act
        let err = parse_cloud_response(reply).unwrap_err();

        // Assert
        assert!(matches!(
            err,
            LinkError::CloudApi { code: 1, ref message } if message == "token expired"
        ));
    }

    #[test]
    fn test_success_returns_result_object() {
        let reply = json!({"error_code": 0, "result": {"token": "abc"}});
        assert_eq!(parse_cloud_response(reply).unwrap(), json!({"token": "abc"}));
    }

    #[test]
    fn test_passthrough_result_is_decoded_then_unwrapped() {
        // Arrange
        let inner = json!({"system": {"get_sysinfo": {"err_code": 0, "alias": "porch"}}});
        let result = json!({"responseData": inner.to_string()});

        // Act
        let unwrapped = parse_passthrough_result(result).unwrap();

        // Assert
        assert_eq!(unwrapped, json!({"err_code": 0, "alias": "porch"}));
    }

    #[test]
    fn test_passthrough_without_response_data_fails() {
        let err = parse_passthrough_result(json!({})).unwrap_err();
        assert!(matches!(
            err,
            LinkError::Protocol(ProtocolError::MissingField("responseData"))
        ));
    }

    #[test]
    fn test_login_params_use_api_field_names() {
        let params = LoginParams {
            app_type: DEFAULT_APP_TYPE,
            cloud_user_name: "me@example.com",
            cloud_password: "hunter2",
            terminal_uuid: "uuid".to_string(),
        };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({
                "appType": "Kasa_Android",
                "cloudUserName": "me@example.com",
                "cloudPassword": "hunter2",
                "terminalUUID": "uuid"
            })
        );
    }

    #[test]
    fn test_relay_endpoint_compares_device_and_token() {
        let a = CloudRelay::new(client().with_token("t")).with_device_id("D1");
        let b = CloudRelay::new(client().with_token("t")).with_device_id("D1");
        let c = CloudRelay::new(client().with_token("u")).with_device_id("D1");
        assert_eq!(a.endpoint(), b.endpoint());
        assert_ne!(a.endpoint(), c.endpoint());
    }

    #[tokio::test]
    async fn test_relay_without_device_id_is_configuration_error() {
        // Arrange
        let relay = CloudRelay::new(client().with_token("t"));

        // Act
        let mut channel = relay.open().await.unwrap();
        let err = channel.send(&json!({"system": {"get_sysinfo": null}})).await.unwrap_err();

        // Assert
        assert!(matches!(err, LinkError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_relay_without_token_is_configuration_error() {
        let relay = CloudRelay::new(client()).with_device_id("D1");
        let mut channel = relay.open().await.unwrap();
        let err = channel.send(&json!({"system": {"get_sysinfo": null}})).await.unwrap_err();
        assert!(matches!(err, LinkError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_device_list_without_token_is_configuration_error() {
        let err = client().device_list().await.unwrap_err();
        assert!(matches!(err, LinkError::Configuration(_)));
    }
}
