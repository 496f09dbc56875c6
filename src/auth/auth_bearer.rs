use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::streamhub_error::StreamHubError;
use crate::utils::MSG_UNAUTHORIZED;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AuthBearer(pub String);

impl<B> FromRequestParts<B> for AuthBearer
where
    B: Send + Sync,
{
    type Rejection = StreamHubError;

    async fn from_request_parts(req: &mut Parts, _: &B) -> Result<Self, Self::Rejection> {
        Self::decode_request_parts(req).ok_or_else(|| StreamHubError::unauthorized(MSG_UNAUTHORIZED))
    }
}

impl AuthBearer {
    fn from_header(contents: &str) -> Self {
        Self(contents.trim().to_string())
    }

    fn decode_request_parts(req: &Parts) -> Option<Self> {
        let authorization = req
            .headers
            .get(axum::http::header::AUTHORIZATION)?
            .to_str()
            .ok()?;

        match authorization.split_once(' ') {
            Some(("Bearer", contents)) if !contents.trim().is_empty() => Some(Self::from_header(contents)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuthBearer;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> axum::http::request::Parts {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_decode() {
        assert_eq!(AuthBearer::decode_request_parts(&parts(Some("Bearer abc.def"))), Some(AuthBearer("abc.def".to_string())));
        assert_eq!(AuthBearer::decode_request_parts(&parts(Some("Basic abc"))), None);
        assert_eq!(AuthBearer::decode_request_parts(&parts(Some("Bearer "))), None);
        assert_eq!(AuthBearer::decode_request_parts(&parts(None)), None);
    }
}
