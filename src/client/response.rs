use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::config::Config;
use crate::errors::Error;
use crate::types::{ApiResponse, SUCCESS_CODE};

/// What a well-formed envelope means for the request that produced it.
pub(super) enum Reply {
    Data(Option<Value>),
    Expired { code: i64, message: Option<String> },
}

/// Reads the `{ code, msg, data }` envelope. The HTTP status is only consulted when the body
/// is not an envelope, so a 401 carrying an expiry code still reaches the refresh path.
pub(super) async fn read_envelope(resp: Response) -> Result<ApiResponse, Error> {
    let status = resp.status();
    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if !is_json {
        warn!(status = status.as_u16(), "response.not_json");
        return Err(Error::InvalidResponse(status));
    }
    let body = resp.bytes().await?;
    match serde_json::from_slice::<ApiResponse>(&body) {
        Ok(envelope) => Ok(envelope),
        Err(err) if status.is_success() => Err(err.into()),
        Err(_) => {
            warn!(status = status.as_u16(), "response.not_envelope");
            Err(Error::InvalidResponse(status))
        }
    }
}

pub(super) fn classify(envelope: ApiResponse, config: &Config) -> Result<Reply, Error> {
    let ApiResponse {
        code, msg, data, ..
    } = envelope;
    if code == SUCCESS_CODE {
        return Ok(Reply::Data(data));
    }
    if config.expiry_codes.contains(&code) {
        return Ok(Reply::Expired { code, message: msg });
    }
    let message = msg
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "Request failed".to_string());
    if config.two_factor_codes.contains(&code) {
        return Err(Error::TwoFactorRequired { code, message });
    }
    Err(Error::Api {
        code,
        message,
        data,
    })
}

pub(super) fn decode<T: DeserializeOwned>(data: Option<Value>) -> Result<T, Error> {
    Ok(serde_json::from_value(data.unwrap_or(Value::Null))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(code: i64, msg: Option<&str>) -> ApiResponse {
        ApiResponse {
            code,
            msg: msg.map(str::to_string),
            data: Some(serde_json::json!({ "id": 7 })),
            timestamp: None,
        }
    }

    #[test]
    fn both_expiry_codes_request_refresh() {
        let config = Config::default();
        for code in [17003, 17004] {
            assert!(matches!(
                classify(envelope(code, None), &config),
                Ok(Reply::Expired { code: c, .. }) if c == code
            ));
        }
    }

    #[test]
    fn other_codes_become_api_errors_with_default_message() {
        let config = Config::default();
        match classify(envelope(40001, Some("")), &config) {
            Err(Error::Api { code, message, data }) => {
                assert_eq!(code, 40001);
                assert_eq!(message, "Request failed");
                assert_eq!(data, Some(serde_json::json!({ "id": 7 })));
            }
            _ => panic!("expected Error::Api"),
        }
        assert!(matches!(
            classify(envelope(17008, Some("need 2fa")), &config),
            Err(Error::TwoFactorRequired { code: 17008, .. })
        ));
    }

    #[test]
    fn missing_data_decodes_as_unit() {
        decode::<()>(None).expect("null decodes to unit");
        assert!(decode::<u32>(None).is_err());
    }
}
