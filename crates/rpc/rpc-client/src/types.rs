//! JSON-RPC frames exchanged with the node.

use crate::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Builds the positional parameter list of a call.
///
/// Every parameter is sent as its string representation.
///
/// ```
/// use blockmetrics_rpc_client::rpc_params;
///
/// let params: Vec<String> = rpc_params![42u64, "latest"];
/// assert_eq!(params, vec!["42".to_string(), "latest".to_string()]);
/// ```
#[macro_export]
macro_rules! rpc_params {
    ($($param:expr),* $(,)?) => {
        ::std::vec![$(::std::string::ToString::to_string(&$param)),*]
    };
}

/// An outgoing call.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    params: &'a [String],
}

impl<'a> Request<'a> {
    pub(crate) const fn new(id: &'a str, method: &'a str, params: &'a [String]) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id, method, params }
    }
}

/// An incoming frame. Exactly one of `result` and `error` is expected.
#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl Response {
    /// The correlation id as a string key. Numeric ids are matched by their decimal form.
    pub(crate) fn correlation_id(&self) -> Option<String> {
        match &self.id {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub(crate) fn into_result(self) -> Result<Value, RpcError> {
        if let Some(ErrorObject { code, message, data }) = self.error {
            let message = match data {
                Some(Value::String(data)) if !data.is_empty() => format!("{message}: {data}"),
                _ => message,
            };
            return Err(RpcError::FailedResponse { code, message })
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn request_encoding() {
        let params = rpc_params![7u64];
        let req = Request::new("3", "commit", &params);
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"jsonrpc":"2.0","id":"3","method":"commit","params":["7"]}"#
        );

        let none: Vec<String> = rpc_params![];
        let req = Request::new("4", "abci_info", &none);
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"jsonrpc":"2.0","id":"4","method":"abci_info"}"#
        );
    }

    #[test]
    fn response_decoding() {
        let ok: Response =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"1","result":{"a":1}}"#).unwrap();
        assert_eq!(ok.correlation_id().as_deref(), Some("1"));
        assert_eq!(ok.into_result().unwrap(), serde_json::json!({"a": 1}));

        let numeric: Response = serde_json::from_str(r#"{"id":12,"result":null}"#).unwrap();
        assert_eq!(numeric.correlation_id().as_deref(), Some("12"));
        assert_eq!(numeric.into_result().unwrap(), Value::Null);

        let failed: Response = serde_json::from_str(
            r#"{"id":"2","error":{"code":-32603,"message":"Internal error","data":"height 9 is not available"}}"#,
        )
        .unwrap();
        assert_matches!(
            failed.into_result(),
            Err(RpcError::FailedResponse { code: -32603, message })
                if message == "Internal error: height 9 is not available"
        );

        let event: Response = serde_json::from_str(r#"{"jsonrpc":"2.0","result":{}}"#).unwrap();
        assert_eq!(event.correlation_id(), None);
    }
}
