//! Defines `State`, the type-keyed extension bag threaded through
//! middleware and handlers for the lifetime of a single request.
//!
//! This plays the role the distilled specification calls `RequestContext`:
//! logger/request-id, the resolved route pattern, upload-size policy,
//! captured path parameters, and any application-defined extension data all
//! live in the same `State`, addressed by type rather than by name.

mod data;
mod from_state;
pub mod request_id;
pub(crate) mod client_addr;
pub(crate) mod matched_pattern;
pub(crate) mod path_params;

use std::any::{Any, TypeId};
use std::collections::HashMap;

pub use self::data::StateData;
pub use self::from_state::FromState;
pub use self::request_id::{request_id, set_request_id};
pub use self::client_addr::client_addr;
pub use self::matched_pattern::matched_pattern;
pub use self::path_params::path_params;

/// Per-request storage for exactly one value of each stored type.
///
/// # Examples
///
/// ```
/// use transom::state::State;
///
/// struct Hits(u32);
///
/// let mut state = State::new();
/// state.put(Hits(1));
/// assert_eq!(state.borrow::<Hits>().0, 1);
/// ```
pub struct State {
    data: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// Creates a new, empty `State`.
    pub fn new() -> State {
        State {
            data: HashMap::new(),
        }
    }

    /// Puts a value into storage, overwriting any existing value of the
    /// same type.
    pub fn put<T>(&mut self, t: T)
    where
        T: StateData,
    {
        let type_id = TypeId::of::<T>();
        log::trace!(" inserting record to state for type_id `{:?}`", type_id);
        self.data.insert(type_id, Box::new(t));
    }

    /// True if a value of type `T` is present.
    pub fn has<T>(&self) -> bool
    where
        T: StateData,
    {
        self.data.contains_key(&TypeId::of::<T>())
    }

    /// Tries to borrow a value from storage.
    pub fn try_borrow<T>(&self) -> Option<&T>
    where
        T: StateData,
    {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    /// Borrows a value from storage.
    ///
    /// # Panics
    ///
    /// If `T` is not present.
    pub fn borrow<T>(&self) -> &T
    where
        T: StateData,
    {
        self.try_borrow()
            .expect("required type is not present in State container")
    }

    /// Tries to mutably borrow a value from storage.
    pub fn try_borrow_mut<T>(&mut self) -> Option<&mut T>
    where
        T: StateData,
    {
        self.data
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    /// Mutably borrows a value from storage.
    ///
    /// # Panics
    ///
    /// If `T` is not present.
    pub fn borrow_mut<T>(&mut self) -> &mut T
    where
        T: StateData,
    {
        self.try_borrow_mut()
            .expect("required type is not present in State container")
    }

    /// Tries to move a value out of storage.
    pub fn try_take<T>(&mut self) -> Option<T>
    where
        T: StateData,
    {
        self.data
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Moves a value out of storage.
    ///
    /// # Panics
    ///
    /// If `T` is not present.
    pub fn take<T>(&mut self) -> T
    where
        T: StateData,
    {
        self.try_take()
            .expect("required type is not present in State container")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MyStruct {
        value: i32,
    }

    struct AnotherStruct {
        value: &'static str,
    }

    #[test]
    fn put_borrow_overwrite() {
        let mut state = State::new();
        state.put(MyStruct { value: 1 });
        assert_eq!(state.borrow::<MyStruct>().value, 1);

        state.put(AnotherStruct { value: "a string" });
        state.put(MyStruct { value: 100 });

        assert_eq!(state.borrow::<AnotherStruct>().value, "a string");
        assert_eq!(state.borrow::<MyStruct>().value, 100);
    }

    #[test]
    fn has_and_try_borrow() {
        let mut state = State::new();
        state.put(MyStruct { value: 1 });
        assert!(state.has::<MyStruct>());
        assert!(!state.has::<AnotherStruct>());
        assert!(state.try_borrow::<AnotherStruct>().is_none());
    }

    #[test]
    fn borrow_mut_updates_in_place() {
        let mut state = State::new();
        state.put(MyStruct { value: 100 });
        if let Some(a) = state.try_borrow_mut::<MyStruct>() {
            a.value += 10;
        }
        assert_eq!(state.borrow::<MyStruct>().value, 110);
    }

    #[test]
    fn take_removes_value() {
        let mut state = State::new();
        state.put(MyStruct { value: 110 });
        assert_eq!(state.try_take::<MyStruct>().unwrap().value, 110);
        assert!(state.try_take::<MyStruct>().is_none());
        assert!(state.try_borrow::<MyStruct>().is_none());
    }

    #[test]
    #[should_panic(expected = "required type is not present in State container")]
    fn borrow_panics_when_absent() {
        let state = State::new();
        state.borrow::<MyStruct>();
    }
}
