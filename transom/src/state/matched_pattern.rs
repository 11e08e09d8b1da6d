//! The declared route pattern that matched the current request, recorded
//! for access logging and telemetry middleware.

use super::State;

#[derive(Debug, Clone)]
pub(crate) struct MatchedPattern(pub String);

pub(crate) fn set(state: &mut State, pattern: &str) {
    state.put(MatchedPattern(pattern.to_owned()));
}

/// The route pattern that matched, e.g. `/users/{id}`, or `None` if
/// dispatch has not run yet.
pub fn matched_pattern(state: &State) -> Option<&str> {
    state.try_borrow::<MatchedPattern>().map(|p| p.0.as_str())
}
