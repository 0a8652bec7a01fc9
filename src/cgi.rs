//! CGI request environment and response framing

use std::collections::HashMap;

use crate::filesystem::enumerator::DirectoryEnumerator;
use crate::filesystem::FileStoreService;
use crate::protocol::{StoreError, StoreResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
    Other(String),
}

impl Method {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

/// Everything a request carries, decoded once at startup.
#[derive(Debug, Clone)]
pub struct RequestEnv {
    pub method: Method,
    pub params: HashMap<String, String>,
}

impl RequestEnv {
    /// `body` is the form-encoded POST body; its fields override the query
    /// string's.
    pub fn new(method: Method, query_string: &str, body: Option<&str>) -> Self {
        let mut params = parse_form(query_string);
        if let Some(body) = body {
            params.extend(parse_form(body));
        }
        Self { method, params }
    }
}

/// Decode `a=1&b=two+words` style input. Later duplicates win and a name
/// without `=` gets an empty value.
pub fn parse_form(input: &str) -> HashMap<String, String> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (decode_component(name), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// Route the request to the store operation for its method.
pub async fn dispatch<E: DirectoryEnumerator>(
    service: &FileStoreService<E>,
    env: &RequestEnv,
) -> Result<StoreResponse, StoreError> {
    match &env.method {
        Method::Get => service.list(&env.params).await,
        Method::Delete => service.delete(&env.params).await,
        Method::Post => service.rename(&env.params).await,
        Method::Other(method) => {
            tracing::warn!(method = method.as_str(), "unsupported request method");
            Err(StoreError::MethodNotAllowed(format!(
                "{} is not supported",
                method
            )))
        }
    }
}

pub fn render_success(response: &StoreResponse) -> Result<String, StoreError> {
    let body = response.to_json()?;
    Ok(format!("Content-Type: text/json\r\n\r\n{}\r\n", body))
}

pub fn render_failure(err: &StoreError) -> String {
    let status = err.status();
    let mut out = format!(
        "Content-Type: text/html\r\nStatus: {} {}\r\n\r\n",
        status.code(),
        status.reason()
    );
    let message = err.client_message();
    if !message.is_empty() {
        out.push_str(message);
        out.push_str("\r\n");
    }
    out
}
