//! Duplicate suppression for received frames.

use std::collections::{HashMap, VecDeque};

use super::MsgKind;

/// Recently seen `(timestamp, session)` keys, a bounded window per message kind.
///
/// Every logical message is sent several times with the same key. Copies of different messages
/// from different senders may interleave, so a single "last timestamp" per kind is not enough.
#[derive(Debug)]
pub struct Dedup {
    window: usize,
    seen: HashMap<MsgKind, VecDeque<(u64, u64)>>,
}

impl Dedup {
    /// Remembers the last `window` keys of each kind
    pub fn new(window: usize) -> Self {
        Dedup { window: window.max(1), seen: HashMap::new() }
    }

    /// `true` the first time a key is seen. The key is remembered.
    pub fn is_new(&mut self, kind: MsgKind, timestamp: u64, session: u64) -> bool {
        let keys = self.seen.entry(kind).or_default();
        if keys.contains(&(timestamp, session)) {
            return false;
        }
        if keys.len() == self.window {
            keys.pop_front();
        }
        keys.push_back((timestamp, session));
        true
    }
}
