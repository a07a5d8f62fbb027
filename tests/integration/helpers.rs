//! Shared test helpers for integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use wsbridge::wsbridge_bridge::host::HostException;
use wsbridge::{BridgeConfig, HostFunction, HostValue, Hub, MockEngine};

/// A hub over a fresh in-memory engine with default configuration.
pub fn hub() -> Hub<MockEngine> {
    Hub::new(MockEngine::new(), BridgeConfig::default()).expect("default config is valid")
}

/// Argument lists a [`Recorder`] function was called with.
pub type Calls = Rc<RefCell<Vec<Vec<HostValue>>>>;

/// A host function that records every call.
pub struct Recorder {
    pub function: HostFunction,
    pub calls: Calls,
}

impl Recorder {
    pub fn new() -> Self {
        let calls: Calls = Rc::new(RefCell::new(Vec::new()));
        let seen = calls.clone();
        let function = HostFunction::new(move |args| {
            seen.borrow_mut().push(args.to_vec());
            Ok(HostValue::Undefined)
        });
        Self { function, calls }
    }

    pub fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn call(&self, index: usize) -> Vec<HostValue> {
        self.calls.borrow()[index].clone()
    }
}

/// A host function that always raises.
pub fn raising(message: &'static str) -> HostFunction {
    HostFunction::new(move |_| Err(HostException::new(message)))
}
