//! Request-id generation as ULIDs.

use http::Request;
use tower_http::request_id::{MakeRequestId, RequestId};
use ulid::Ulid;

/// Generates a fresh [Ulid] for every incoming request, propagated via the
/// `request_id` header.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _: &Request<B>) -> Option<RequestId> {
        let id = Ulid::new().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_request_id() {
        let mut maker = MakeRequestUlid;
        let req = Request::builder().body(()).unwrap();

        let id = maker.make_request_id(&req).unwrap();
        let value = id.header_value().to_str().unwrap().to_string();

        assert_eq!(value.len(), 26);
        assert!(Ulid::from_string(&value).is_ok());
    }
}
