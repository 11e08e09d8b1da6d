//! The path parameters captured by the router for the route that matched
//! the current request.

use super::State;
use crate::router::tree::PathParams;

/// Stores the captures from a successful route resolution; called by
/// `Router::dispatch` immediately before invoking the matched responder.
pub(crate) fn set(state: &mut State, params: PathParams) {
    state.put(params);
}

/// The path parameters captured for this request, if the router has run.
/// Absent before dispatch (e.g. inside connection-level middleware that
/// runs ahead of routing).
pub fn path_params(state: &State) -> Option<&PathParams> {
    state.try_borrow::<PathParams>()
}
