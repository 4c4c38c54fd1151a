use futures::channel::mpsc;
use futures::stream::Stream;
use idbkit_core::StoreError;
use std::cell::RefCell;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::debug;
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventTarget, IdbRequest};

use crate::error::{from_event, from_js};

/// Every `success` of a request (a cursor request fires one per step) as a stream of its results
pub struct CBStream {
    receiver: mpsc::UnboundedReceiver<Result<JsValue, StoreError>>,
    _registrations: Vec<(&'static str, Closure<dyn FnMut(Event)>, EventTarget)>,
}

impl CBStream {
    pub fn new(request: &IdbRequest) -> Result<Self, StoreError> {
        let (sender, receiver) = mpsc::unbounded();
        let mut registrations = Vec::new();
        let target: &EventTarget = request.as_ref();

        let sender = Rc::new(RefCell::new(Some(sender)));

        let success_callback = Closure::wrap(Box::new({
            let sender = sender.clone();
            let request = request.clone();
            move |_event: Event| {
                if let Some(sender) = sender.borrow().as_ref() {
                    let _ = sender.unbounded_send(request.result().map_err(from_js));
                }
            }
        }) as Box<dyn FnMut(_)>);

        let error_callback = Closure::wrap(Box::new({
            let sender = sender;
            move |event: Event| {
                let error = from_event(&event);
                debug!("cursor error: {}", error);
                if let Some(sender) = sender.borrow_mut().take() {
                    let _ = sender.unbounded_send(Err(error));
                }
            }
        }) as Box<dyn FnMut(_)>);

        target.add_event_listener_with_callback("success", success_callback.as_ref().unchecked_ref()).map_err(from_js)?;
        target.add_event_listener_with_callback("error", error_callback.as_ref().unchecked_ref()).map_err(from_js)?;

        registrations.push(("success", success_callback, target.clone()));
        registrations.push(("error", error_callback, target.clone()));

        Ok(Self { receiver, _registrations: registrations })
    }
}

impl Stream for CBStream {
    type Item = Result<JsValue, StoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> { Pin::new(&mut self.receiver).poll_next(cx) }
}

impl Drop for CBStream {
    fn drop(&mut self) {
        for (event_name, callback, target) in &self._registrations {
            let _ = target.remove_event_listener_with_callback(event_name, callback.as_ref().unchecked_ref());
        }
    }
}
