use actix_web::{
    error::{Error, JsonPayloadError},
    middleware::DefaultHeaders,
    web::{Form, Json},
    Either, HttpRequest,
};

use crate::errors::HttpError;

/// Form-or-JSON body for the webhook and webmention endpoints, which
/// accept either encoding depending on the caller.
pub type FormOrJson<T> = Either<Form<T>, Json<T>>;

/// Unwraps a [`FormOrJson`] regardless of which side the caller used.
pub fn form_or_json_into_inner<T>(body: FormOrJson<T>) -> T {
    match body {
        Either::Left(form) => form.into_inner(),
        Either::Right(json) => json.into_inner(),
    }
}

/// Converts JSON payload deserialization errors into validation errors,
/// so malformed webhook/webmention bodies produce the same 400 shape as
/// a failed field check.
pub fn json_error_handler(error: JsonPayloadError, _: &HttpRequest) -> Error {
    match error {
        JsonPayloadError::Deserialize(de_error) => HttpError::ValidationError(de_error.to_string()).into(),
        other_error => other_error.into(),
    }
}

pub fn create_default_headers_middleware() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("Link", "</webmention>; rel=\"webmention\""))
}

/// Best-effort client IP: the leftmost `X-Forwarded-For` entry behind a
/// reverse proxy, falling back to the TCP peer address.
pub fn real_ip(request: &HttpRequest) -> String {
    if let Some(forwarded) = request.headers().get("X-Forwarded-For") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let candidate = first.trim();
                if !candidate.is_empty() {
                    return candidate.to_owned();
                }
            }
        }
    }
    request
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_real_ip_prefers_forwarded_for() {
        let request = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.5, 10.0.0.1"))
            .to_http_request();
        assert_eq!(real_ip(&request), "203.0.113.5");
    }

    #[test]
    fn test_real_ip_falls_back_without_header() {
        let request = TestRequest::default().to_http_request();
        assert_eq!(real_ip(&request), "unknown");
    }
}
