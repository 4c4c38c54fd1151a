use futures::channel::oneshot;
use futures::FutureExt;
use idbkit_core::StoreError;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::debug;
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventTarget};

use crate::error::{from_event, from_js};

/// A future that resolves when one of the given events is dispatched on the target.
///
/// The error is read off the event inside the listener, while the target still holds it.
pub struct CBFuture {
    receiver: oneshot::Receiver<Result<(), StoreError>>,
    _registrations: Vec<(&'static str, Closure<dyn FnMut(Event)>, EventTarget)>, // (event name, callback, target)
}

#[derive(Clone)]
pub enum EventNames {
    Single(Option<&'static str>),
    Multiple { events: &'static [&'static str], index: usize },
}

impl Iterator for EventNames {
    type Item = &'static str;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            EventNames::Single(opt) => opt.take(),
            EventNames::Multiple { events, index } => {
                if *index < events.len() {
                    let ev = events[*index];
                    *index += 1;
                    Some(ev)
                } else {
                    None
                }
            }
        }
    }
}

impl From<&'static str> for EventNames {
    fn from(event: &'static str) -> Self { Self::Single(Some(event)) }
}

impl<const N: usize> From<&'static [&'static str; N]> for EventNames {
    fn from(events: &'static [&'static str; N]) -> Self { Self::Multiple { events, index: 0 } }
}

impl CBFuture {
    pub fn new<T: AsRef<EventTarget>, S: Into<EventNames>, E: Into<EventNames>>(
        target: T,
        success_events: S,
        error_events: E,
    ) -> Result<Self, StoreError> {
        let (sender, receiver) = oneshot::channel();
        let mut registrations = Vec::new();
        let target = target.as_ref();

        let sender = Rc::new(RefCell::new(Some(sender)));

        for event_name in success_events.into() {
            let success_cb = Closure::wrap(Box::new({
                let sender = sender.clone();
                move |_event: Event| {
                    if let Some(sender) = sender.borrow_mut().take() {
                        let _ = sender.send(Ok(()));
                    }
                }
            }) as Box<dyn FnMut(_)>);

            target.add_event_listener_with_callback(event_name, success_cb.as_ref().unchecked_ref()).map_err(from_js)?;
            registrations.push((event_name, success_cb, target.clone()));
        }

        for event_name in error_events.into() {
            let error_cb = Closure::wrap(Box::new({
                let sender = sender.clone();
                move |event: Event| {
                    let error = from_event(&event);
                    debug!("{} event: {}", event.type_(), error);
                    if let Some(sender) = sender.borrow_mut().take() {
                        let _ = sender.send(Err(error));
                    }
                }
            }) as Box<dyn FnMut(_)>);

            target.add_event_listener_with_callback(event_name, error_cb.as_ref().unchecked_ref()).map_err(from_js)?;
            registrations.push((event_name, error_cb, target.clone()));
        }

        Ok(Self { receiver, _registrations: registrations })
    }
}

impl Future for CBFuture {
    type Output = Result<(), StoreError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver.poll_unpin(cx).map(|r| match r {
            Ok(result) => result,
            Err(_) => Err(StoreError::Abort("event listeners were dropped".into())),
        })
    }
}

impl Drop for CBFuture {
    fn drop(&mut self) {
        for (event_name, callback, target) in &self._registrations {
            let _ = target.remove_event_listener_with_callback(event_name, callback.as_ref().unchecked_ref());
        }
    }
}
