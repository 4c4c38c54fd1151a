use idbkit_core::{Key, StoreError};

/// The kind of request a [`Fault`] applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Op {
    Open,
    Add,
    Put,
    Get,
    Delete,
    Clear,
    Count,
    IndexGet,
    Cursor,
}

/// A failure the engine reports instead of performing a matching request.
///
/// Request faults abort the surrounding transaction, just as a failed request does in the
/// browser. For [`Op::Open`] the store filter matches the database name.
#[derive(Debug, Clone)]
pub struct Fault {
    op: Op,
    store: Option<String>,
    key: Option<Key>,
    error: StoreError,
    remaining: usize,
}

impl Fault {
    pub fn new(op: Op, error: StoreError) -> Self { Self { op, store: None, key: None, error, remaining: 1 } }

    pub fn on_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    pub fn on_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Trip this many times before disarming (default 1)
    pub fn times(mut self, times: usize) -> Self {
        self.remaining = times;
        self
    }

    pub(crate) fn matches(&self, op: Op, store: &str, key: Option<&Key>) -> bool {
        self.remaining > 0
            && self.op == op
            && self.store.as_deref().map_or(true, |s| s == store)
            && self.key.as_ref().map_or(true, |k| Some(k) == key)
    }

    /// Consume one trip, returning the error to report
    pub(crate) fn trip(&mut self) -> StoreError {
        self.remaining = self.remaining.saturating_sub(1);
        self.error.clone()
    }

    pub(crate) fn is_spent(&self) -> bool { self.remaining == 0 }
}
