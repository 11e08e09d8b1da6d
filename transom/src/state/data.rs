//! Defines the `StateData` marker trait.

/// Types stored in [`State`](super::State) must implement `StateData`.
///
/// Rather than requiring each stored type to derive this marker by hand,
/// this crate provides a blanket implementation: anything `Send + 'static`
/// can be stored. A
/// request's `State` never crosses an `.await` point without the task that
/// owns it, so `Sync` is not required.
pub trait StateData: Send + 'static {}

impl<T> StateData for T where T: Send + 'static {}
