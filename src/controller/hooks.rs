//! Extra per-input callbacks registered by the embedding host.

use std::collections::HashMap;
use std::fmt;

use crate::input::GamepadInput;

/// Side-effecting hook fired after an input has been processed.
pub type InputCallback = Box<dyn FnMut() + Send>;

/// Input-keyed callback table. One callback per input; registering again
/// replaces the previous one.
#[derive(Default)]
pub struct CallbackTable {
    callbacks: HashMap<GamepadInput, InputCallback>,
}

impl fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTable")
            .field("inputs", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CallbackTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, input: GamepadInput, callback: InputCallback) {
        self.callbacks.insert(input, callback);
    }

    /// Runs the callback bound to `input`, if any.
    pub fn fire(&mut self, input: GamepadInput) {
        if let Some(callback) = self.callbacks.get_mut(&input) {
            callback();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, InputCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, Box::new(move || {
            handle.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_fire_bound_input() {
        let mut table = CallbackTable::new();
        let (count, cb) = counter();
        table.register(GamepadInput::Y, cb);

        table.fire(GamepadInput::Y);
        table.fire(GamepadInput::Y);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fire_unbound_input_is_noop() {
        let mut table = CallbackTable::new();
        let (count, cb) = counter();
        table.register(GamepadInput::Y, cb);

        table.fire(GamepadInput::A);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_register_replaces() {
        let mut table = CallbackTable::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        table.register(GamepadInput::Menu2, cb1);
        table.register(GamepadInput::Menu2, cb2);

        table.fire(GamepadInput::Menu2);
        assert_eq!(table.len(), 1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
