#![allow(dead_code)]

use std::path::PathBuf;

use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use wiremock::ResponseTemplate;

pub fn envelope(code: i64, msg: &str, data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": code,
        "msg": msg,
        "data": data,
        "timestamp": 1_700_000_000
    }))
}

pub fn ok(data: Value) -> ResponseTemplate {
    envelope(200, "success", data)
}

/// Per-test session file so parallel tests never share state.
pub fn session_file(label: &str) -> PathBuf {
    let mut path = PathBuf::from("target");
    path.push("test-sessions");
    path.push(format!("{}-{}.json", label, uuid::Uuid::new_v4()));
    path
}

/// An HS256 JWT carrying only `sub` and `exp`, as the backend issues access tokens.
pub fn jwt_expiring_in(secs: i64) -> String {
    let exp = jiff::Timestamp::now().as_second() + secs;
    jsonwebtoken::encode(
        &Header::default(),
        &json!({ "sub": "admin", "exp": exp }),
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("jwt encodes")
}
