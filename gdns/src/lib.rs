//! Action handler mutating the target-project list of GlobalDNS records.
//!
//! The HTTP surface is `POST /v3/globaldnses/{namespace}:{name}?action=…`
//! for the two mutations and `GET` on the same path for the record with
//! its advertised actions. Everything stateful lives behind the injected
//! [`store::RecordStore`] and [`access::AccessOracle`] collaborators.

pub mod access;
pub mod actions;
pub mod client;
pub mod diff;
pub mod errors;
pub mod input;
pub mod metrics_defs;
pub mod store;
pub mod types;
pub mod update;

#[cfg(test)]
pub mod testutils;

use crate::actions::{advertise, ActionHandler};
use crate::errors::GlobalDnsError;
use crate::types::IMPERSONATE_USER_HEADER;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;

pub const GLOBALDNS_PATH_PREFIX: &str = "/v3/globaldnses/";

type ServiceBody = BoxBody<Bytes, GlobalDnsError>;

#[derive(Clone)]
pub struct GlobalDnsService {
    handler: Arc<ActionHandler>,
    impersonation_header: Arc<str>,
}

impl GlobalDnsService {
    pub fn new(handler: ActionHandler) -> Self {
        GlobalDnsService {
            handler: Arc::new(handler),
            impersonation_header: Arc::from(IMPERSONATE_USER_HEADER),
        }
    }

    /// Override the header carrying the caller identity.
    pub fn with_impersonation_header(mut self, name: &str) -> Self {
        self.impersonation_header = Arc::from(name);
        self
    }
}

impl Service<Request<Incoming>> for GlobalDnsService {
    type Response = Response<ServiceBody>;
    type Error = GlobalDnsError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let handler = self.handler.clone();
        let impersonation_header = self.impersonation_header.clone();
        Box::pin(async move {
            let response = match route(&handler, &impersonation_header, req).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(error = %err, "request failed");
                    error_response(&err)?
                }
            };
            Ok(response)
        })
    }
}

async fn route<B>(
    handler: &ActionHandler,
    impersonation_header: &str,
    req: Request<B>,
) -> Result<Response<ServiceBody>, GlobalDnsError>
where
    B: Body<Data = Bytes> + Send,
    GlobalDnsError: From<B::Error>,
{
    let path = req.uri().path().to_string();
    let Some(record_id) = path.strip_prefix(GLOBALDNS_PATH_PREFIX) else {
        return Ok(shared::http::make_error_response(StatusCode::NOT_FOUND));
    };
    let record_id = record_id.to_string();
    let caller = req
        .headers()
        .get(impersonation_header)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match req.method() {
        &Method::GET => {
            let record = handler.fetch(&record_id, &caller).await?;
            let mut resource = match serde_json::to_value(&record)? {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            resource.insert("id".to_string(), Value::String(record_id));
            advertise(&path, &mut resource);
            json_response(StatusCode::OK, &Value::Object(resource))
        }
        &Method::POST => {
            let action = action_param(req.uri().query()).unwrap_or_default().to_string();
            let body = req.into_body().collect().await?.to_bytes();

            let message = handler.handle(&action, &record_id, &caller, &body).await?;
            json_response(StatusCode::OK, &json!({ "message": message }))
        }
        _ => Ok(shared::http::make_error_response(
            StatusCode::METHOD_NOT_ALLOWED,
        )),
    }
}

fn action_param(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("action="))
}

fn json_response(status: StatusCode, value: &Value) -> Result<Response<ServiceBody>, GlobalDnsError> {
    let bytes = serde_json::to_vec(value).map(Bytes::from)?;
    Ok(Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(bytes).map_err(|never| match never {}).boxed())?)
}

/// Standard API error envelope.
fn error_response(err: &GlobalDnsError) -> Result<Response<ServiceBody>, GlobalDnsError> {
    let status = err.status();
    json_response(
        status,
        &json!({
            "type": "error",
            "status": status.as_u16(),
            "code": err.code(),
            "message": err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{test_record, InMemoryRecordStore, StaticEnv, TEST_CREATOR};
    use crate::update::Backoff;
    use tokio::time::Duration;

    fn test_handler(store: InMemoryRecordStore, env: StaticEnv) -> ActionHandler {
        ActionHandler::new(Arc::new(store), Arc::new(env.member_access())).with_backoff(Backoff {
            initial: Duration::from_millis(1),
            ..Backoff::default()
        })
    }

    fn post(uri: &str, caller: &str, body: Value) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(IMPERSONATE_USER_HEADER, caller)
            .body(Full::new(Bytes::from(serde_json::to_vec(&body).unwrap())))
            .unwrap()
    }

    async fn body_json(response: Response<ServiceBody>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_add_projects_returns_message_envelope() {
        let handler = test_handler(
            InMemoryRecordStore::new(vec![test_record("ns", "gdns-1", &["p1"])]),
            StaticEnv::default().with_project_access(TEST_CREATOR, "p2"),
        );

        let req = post(
            "/v3/globaldnses/ns:gdns-1?action=addProjects",
            TEST_CREATOR,
            json!({"projectIds": ["p2"]}),
        );
        let response = route(&handler, IMPERSONATE_USER_HEADER, req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"message": "addedProjects"}));
    }

    #[tokio::test]
    async fn post_remove_projects_returns_message_envelope() {
        let handler = test_handler(
            InMemoryRecordStore::new(vec![test_record("ns", "gdns-1", &["p1", "p2"])]),
            StaticEnv::default(),
        );

        let req = post(
            "/v3/globaldnses/ns:gdns-1?action=removeProjects",
            TEST_CREATOR,
            json!({"projectIds": ["p2"]}),
        );
        let response = route(&handler, IMPERSONATE_USER_HEADER, req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"message": "removedProjects"})
        );
    }

    #[tokio::test]
    async fn forbidden_error_renders_api_envelope() {
        let handler = test_handler(
            InMemoryRecordStore::new(vec![test_record("ns", "gdns-1", &["p1"])]),
            StaticEnv::default(),
        );

        let req = post(
            "/v3/globaldnses/ns:gdns-1?action=addProjects",
            "local://u-stranger",
            json!({"projectIds": ["p2"]}),
        );
        let err = route(&handler, IMPERSONATE_USER_HEADER, req).await.unwrap_err();
        let response = error_response(&err).unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["type"], "error");
        assert_eq!(body["code"], "Forbidden");
        assert_eq!(
            body["message"],
            "only owners can modify global DNS target projects"
        );
    }

    #[tokio::test]
    async fn get_record_advertises_actions() {
        let handler = test_handler(
            InMemoryRecordStore::new(vec![test_record("ns", "gdns-1", &["p1"])]),
            StaticEnv::default(),
        );

        let req = Request::builder()
            .method(Method::GET)
            .uri("/v3/globaldnses/ns:gdns-1")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = route(&handler, IMPERSONATE_USER_HEADER, req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], "ns:gdns-1");
        assert_eq!(body["projectIds"], json!(["p1"]));
        assert_eq!(
            body["actions"]["addProjects"],
            "/v3/globaldnses/ns:gdns-1?action=addProjects"
        );
        assert_eq!(
            body["actions"]["removeProjects"],
            "/v3/globaldnses/ns:gdns-1?action=removeProjects"
        );
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let handler = test_handler(InMemoryRecordStore::new(vec![]), StaticEnv::default());

        let req = Request::builder()
            .method(Method::GET)
            .uri("/v3/clusters/c-1")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = route(&handler, IMPERSONATE_USER_HEADER, req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_action_param_is_a_bad_action() {
        let handler = test_handler(
            InMemoryRecordStore::new(vec![test_record("ns", "gdns-1", &["p1"])]),
            StaticEnv::default(),
        );

        let req = post("/v3/globaldnses/ns:gdns-1", TEST_CREATOR, json!({}));
        let err = route(&handler, IMPERSONATE_USER_HEADER, req)
            .await
            .unwrap_err();
        assert!(matches!(err, GlobalDnsError::BadAction(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn caller_read_from_configured_impersonation_header() {
        let handler = test_handler(
            InMemoryRecordStore::new(vec![test_record("ns", "gdns-1", &["p1", "p2"])]),
            StaticEnv::default(),
        );

        let req = Request::builder()
            .method(Method::POST)
            .uri("/v3/globaldnses/ns:gdns-1?action=removeProjects")
            .header("X-Remote-User", TEST_CREATOR)
            .body(Full::new(Bytes::from(
                serde_json::to_vec(&json!({"projectIds": ["p2"]})).unwrap(),
            )))
            .unwrap();
        let response = route(&handler, "X-Remote-User", req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn default_header_is_ignored_under_an_override() {
        let handler = test_handler(
            InMemoryRecordStore::new(vec![test_record("ns", "gdns-1", &["p1", "p2"])]),
            StaticEnv::default(),
        );

        // Caller identity sent in the default header is not read
        let req = post(
            "/v3/globaldnses/ns:gdns-1?action=removeProjects",
            TEST_CREATOR,
            json!({"projectIds": ["p2"]}),
        );
        let err = route(&handler, "X-Remote-User", req).await.unwrap_err();
        assert!(matches!(err, GlobalDnsError::NotOwner));
    }
}
