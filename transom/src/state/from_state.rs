//! Defines `FromState`, a convenience trait for borrowing well-known state.

use super::{State, StateData};

/// Implemented for types which can be borrowed directly from a [`State`].
///
/// This exists so handler and middleware signatures can write
/// `SomeStateData::borrow_from(&state)` instead of the more verbose
/// `state.borrow::<SomeStateData>()`.
pub trait FromState: StateData + Sized {
    /// Borrows this value from the provided `State`.
    fn borrow_from(state: &State) -> &Self;

    /// Mutably borrows this value from the provided `State`.
    fn borrow_mut_from(state: &mut State) -> &mut Self;

    /// Moves this value out of the provided `State`.
    fn take_from(state: &mut State) -> Self;
}

impl<T> FromState for T
where
    T: StateData,
{
    fn borrow_from(state: &State) -> &Self {
        state.borrow::<Self>()
    }

    fn borrow_mut_from(state: &mut State) -> &mut Self {
        state.borrow_mut::<Self>()
    }

    fn take_from(state: &mut State) -> Self {
        state.take::<Self>()
    }
}
