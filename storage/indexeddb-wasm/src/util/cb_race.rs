use idbkit_core::StoreError;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

use tokio::sync::oneshot::{self, error::TryRecvError};
use wasm_bindgen::prelude::Closure;

/// the first callback to finish wins
pub struct CBRace<T: 'static> {
    sender: Rc<RefCell<Option<oneshot::Sender<T>>>>,
    receiver: oneshot::Receiver<T>,
}

impl<T: 'static> CBRace<T> {
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self { sender: Rc::new(RefCell::new(Some(sender))), receiver }
    }

    /// Wrap a closure, sending its result through the channel, returns the js function ref
    pub fn wrap<Args>(&self, f: impl Fn(Args) -> T + 'static) -> Closure<dyn FnMut(Args)>
    where Args: wasm_bindgen::convert::FromWasmAbi + 'static {
        let sender = self.sender.clone();
        Closure::wrap(Box::new(move |args| {
            let result = f(args);
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(result);
            }
        }))
    }
}

impl<E> CBRace<Result<(), E>> {
    /// The callback's error, if it ran and failed. Not running at all counts as success.
    pub fn take_err(mut self) -> Result<Result<(), E>, TakeError> {
        match self.receiver.try_recv() {
            Ok(Ok(result)) => Ok(Ok(result)),
            Ok(Err(e)) => Ok(Err(e)),
            Err(TryRecvError::Empty) => Ok(Ok(())),
            Err(TryRecvError::Closed) => Err(TakeError::Closed),
        }
    }
}

#[derive(Error, Debug)]
pub enum TakeError {
    #[error("receiver is closed")]
    Closed,
}

impl From<TakeError> for StoreError {
    fn from(val: TakeError) -> Self { StoreError::Engine { code: "UnknownError".into(), message: val.to_string() } }
}
