//! The request execution contract shared by every Graph operation.
//!
//! A response body is parsed into a JSON value first, then classified into an
//! [`Envelope`] by looking for an `error` key. Only a `Data` envelope on a
//! successful status is decoded into the operation's type.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{Error, GraphError},
    MetaError,
};

pub(crate) mod client;

/// A Graph response body, decided by the presence of an `error` key.
#[derive(PartialEq, Debug)]
pub(crate) enum Envelope {
    Data(Value),
    Error(MetaError),
}

impl Envelope {
    pub(crate) fn classify(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.get("error").is_some_and(is_set) => {
                let raw = map.remove("error").unwrap_or_default();
                Envelope::Error(meta_error(raw))
            }
            other => Envelope::Data(other),
        }
    }
}

// Falsy values (`null`, `false`, `0`, `""`) are not error reports.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn meta_error(raw: Value) -> MetaError {
    match raw {
        Value::String(message) => MetaError {
            message: Some(message),
            ..Default::default()
        },
        other => serde_json::from_value(other).unwrap_or_default(),
    }
}

/// Sends the request and applies the execution contract to the response.
pub(crate) async fn execute_request<T>(request: RequestBuilder) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    let response = request.send().await?;
    handle_response(response).await
}

pub(crate) async fn handle_response<T>(response: Response) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response.bytes().await?;
    decode_body(status, &body).map_err(Error::from)
}

pub(crate) fn decode_body<T>(status: StatusCode, body: &[u8]) -> Result<T, GraphError>
where
    T: DeserializeOwned,
{
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        debug!(status = status.as_u16(), "graph response was not JSON");
        return Err(GraphError::non_json(status));
    };

    match Envelope::classify(value) {
        Envelope::Error(error) => {
            debug!(status = status.as_u16(), code = ?error.code, "graph error envelope");
            Err(GraphError::api(status, error))
        }
        Envelope::Data(_) if !status.is_success() => {
            Err(GraphError::api(status, MetaError::default()))
        }
        Envelope::Data(value) => {
            serde_json::from_value(value).map_err(|err| GraphError::decode(status, err))
        }
    }
}
