use std::ops::Bound;

use storage::{ADDRESS_SIZE, TupleAddress};

use crate::engine::{EngineCursor, OrderedEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorState {
    #[default]
    Idle,
    Positioned,
    Exhausted,
}

/// Scan position over an ordered engine: the value run of the current key,
/// the next slot to hand out, and an engine cursor for the keys that follow.
///
/// Exact positioning loads one key's run and leaves the engine cursor just
/// past that key. Range positioning leaves the run empty and the engine
/// cursor at the bound, so the first `next_address` pulls the first key in
/// range.
#[derive(Debug, Default)]
pub struct ScanCursor {
    state: CursorState,
    run: Vec<u8>,
    offset: usize,
    forward: bool,
    engine_cursor: EngineCursor,
}

impl ScanCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Drops any buffered run and forgets the position.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Positions on a key found by a point lookup.
    pub fn position_at_key(&mut self, key: &[u8], run: Vec<u8>) {
        self.state = CursorState::Positioned;
        self.run = run;
        self.offset = 0;
        self.forward = true;
        self.engine_cursor = EngineCursor::after(key);
    }

    /// Positions before the first key inside `bound`; `None` means nothing
    /// can follow.
    pub fn position_at_bound(&mut self, bound: Option<Bound<Vec<u8>>>) {
        let Some(bound) = bound else {
            self.position_exhausted();
            return;
        };
        self.state = CursorState::Positioned;
        self.run = Vec::new();
        self.offset = 0;
        self.forward = true;
        self.engine_cursor = EngineCursor::new(bound);
    }

    /// Point lookup missed.
    pub fn position_exhausted(&mut self) {
        self.state = CursorState::Exhausted;
        self.run = Vec::new();
        self.offset = 0;
        self.engine_cursor = EngineCursor::exhausted();
    }

    /// Next address of the current key only.
    pub fn next_address_at_key(&mut self) -> Option<TupleAddress> {
        if self.state != CursorState::Positioned {
            return None;
        }
        while self.offset + ADDRESS_SIZE <= self.run.len() {
            let slot = &self.run[self.offset..self.offset + ADDRESS_SIZE];
            self.offset += ADDRESS_SIZE;
            if let Some(address) = TupleAddress::from_bytes(slot) {
                return Some(address);
            }
        }
        None
    }

    /// Next address in key order, crossing into following keys as runs drain.
    pub fn next_address<E: OrderedEngine + ?Sized>(&mut self, engine: &E) -> Option<TupleAddress> {
        loop {
            if let Some(address) = self.next_address_at_key() {
                return Some(address);
            }
            if !self.advance_to_next_key(engine) {
                return None;
            }
        }
    }

    /// Replaces the current run with the next distinct key's run.
    pub fn advance_to_next_key<E: OrderedEngine + ?Sized>(&mut self, engine: &E) -> bool {
        if self.state != CursorState::Positioned {
            return false;
        }
        match self.engine_cursor.advance(engine) {
            Some((_, run)) => {
                self.run = run;
                self.offset = 0;
                true
            }
            None => {
                self.position_exhausted();
                false
            }
        }
    }
}
