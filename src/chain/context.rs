use crate::auth::Principal;
use crate::error::GatewayError;
use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use uuid::Uuid;

/// Per-request carrier passed through the filter chain.
///
/// Holds the inbound request, the mutable response slot filters and the
/// terminal handler write into, and the principal once authentication has
/// resolved one. Created per request, discarded when the request completes.
pub struct RequestContext {
    id: Uuid,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    principal: Option<Principal>,
    response: ResponseSlot,
    short_circuited: bool,
}

/// Mutable response state accumulated while the chain unwinds.
///
/// Headers inserted by filters before the terminal handler runs (rate-limit
/// headers, CORS decorations) persist across whatever status and body are
/// eventually written, including error responses from the chain boundary.
#[derive(Debug)]
pub struct ResponseSlot {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for ResponseSlot {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl RequestContext {
    /// Create a new context from inbound request parts
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            uri,
            headers,
            body,
            principal: None,
            response: ResponseSlot::default(),
            short_circuited: false,
        }
    }

    /// Request identifier attached to log records
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The `Origin` header value, if the request carries one
    pub fn origin(&self) -> Option<&str> {
        self.headers.get("origin").and_then(|v| v.to_str().ok())
    }

    /// Principal resolved by the authentication gate, if any
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub fn response(&self) -> &ResponseSlot {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseSlot {
        &mut self.response
    }

    /// Produce a terminal response from this filter, skipping the rest of
    /// the chain. The caller must not invoke `next` afterwards.
    pub fn short_circuit(&mut self, status: StatusCode, body: Bytes) {
        self.response.status = status;
        self.response.body = body;
        self.short_circuited = true;
    }

    pub fn is_short_circuited(&self) -> bool {
        self.short_circuited
    }

    /// Chain-boundary error conversion: map the error to its status and a
    /// JSON body, keeping headers already accumulated on the response.
    pub fn fail(&mut self, err: &GatewayError) {
        let status = err.status_code();
        let body = serde_json::json!({
            "error": err.to_string(),
            "status": status.as_u16(),
        });

        self.response.status = status;
        self.response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.response.body = Bytes::from(body.to_string());
    }

    /// Consume the context into the HTTP response sent to the caller
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.response.body));
        *response.status_mut() = self.response.status;
        *response.headers_mut() = self.response.headers;
        response
    }
}
