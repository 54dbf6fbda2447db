//! Integration tests for the smartlight-core wire format.
//!
//! These tests drive a request through the same steps a transport performs
//! (wrap → JSON text → encrypt) and a response back through the reverse
//! path (decrypt → JSON → unwrap), using only the crate's public API.

use serde_json::{json, Value};
use smartlight_core::{
    decrypt, decrypt_framed, encrypt, encrypt_framed, protocol::frame_len, unwrap,
    LightStateParams, ProtocolError, Request,
};

/// Simulates what a device does with a request: decipher, parse, answer.
fn device_echo_reply(framed_request: &[u8], result: Value) -> Vec<u8> {
    let text = decrypt_framed(framed_request).expect("request deciphers");
    let request: Value = serde_json::from_str(&text).expect("request is JSON");
    let (ns, body) = request.as_object().unwrap().iter().next().unwrap();
    let cmd = body.as_object().unwrap().keys().next().unwrap();
    let reply = smartlight_core::wrap(ns, cmd, Some(result));
    encrypt_framed(&reply.to_string())
}

#[test]
fn test_request_survives_framed_round_trip() {
    // Arrange
    let req = Request::new("smartlife.iot.smartbulb.lightingservice", "transition_light_state")
        .with_params(&LightStateParams::new().on_off(true))
        .unwrap();

    // Act
    let framed = encrypt_framed(&req.to_json());
    let restored: Value = serde_json::from_str(&decrypt_framed(&framed).unwrap()).unwrap();

    // Assert
    assert_eq!(restored, req.to_value());
    assert_eq!(
        frame_len(framed[..4].try_into().unwrap()),
        req.to_json().len()
    );
}

#[test]
fn test_reply_unwraps_to_result_object() {
    // Arrange
    let req = Request::new("system", "get_sysinfo");
    let framed = encrypt_framed(&req.to_json());
    let reply = device_echo_reply(&framed, json!({"err_code": 0, "model": "LB130(US)"}));

    // Act
    let text = decrypt_framed(&reply).unwrap();
    let result = unwrap(serde_json::from_str(&text).unwrap()).unwrap();

    // Assert
    assert_eq!(result["model"], "LB130(US)");
    assert_eq!(result["err_code"], 0);
}

#[test]
fn test_datagram_round_trip_has_no_header() {
    let msg = r#"{"system":{"get_sysinfo":{}}}"#;
    let datagram = encrypt(msg);
    assert_eq!(datagram.len(), msg.len());
    assert_eq!(decrypt(&datagram).unwrap(), msg);
}

#[test]
fn test_garbage_reply_is_reported_not_panicked() {
    // A valid cipher stream whose plaintext is not JSON.
    let reply = encrypt_framed("not json");
    let text = decrypt_framed(&reply).unwrap();
    let parsed: Result<Value, _> = serde_json::from_str(&text);
    assert!(parsed.is_err());

    // And a JSON document with the wrong shape.
    let err = unwrap(json!({"a": 1, "b": 2})).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedEnvelope(_)));
}
