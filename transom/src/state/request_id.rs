//! Assigns and retrieves a per-request identifier, used to correlate log
//! lines emitted while a single request is in flight.

use uuid::Uuid;

use super::State;

/// Stored in `State` for the lifetime of one request.
pub struct RequestId(String);

impl RequestId {
    fn new() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

/// Assigns a fresh request id. Called once, when a `State` is created for
/// an incoming request.
pub fn set_request_id(state: &mut State) {
    state.put(RequestId::new());
}

/// Returns the request id for logging, or `"-"` if none has been assigned
/// (for example, in unit tests that construct a bare `State`).
pub fn request_id(state: &State) -> &str {
    state
        .try_borrow::<RequestId>()
        .map(|r| r.0.as_str())
        .unwrap_or("-")
}
