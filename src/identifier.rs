//! Per-endpoint identifier allocation (C5): a 256-slot bitmap with a
//! rotating cursor, so identifiers are reused only after wrapping all the
//! way around (spec.md §4.3) rather than being snatched up immediately
//! after release.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use crate::error::Error;

/// Bitmap of the 256 possible identifier values for one endpoint, plus a
/// cursor remembering where the last search left off.
struct Slots {
    in_use: [bool; 256],
    cursor: usize,
}

impl Slots {
    fn new() -> Self {
        Self {
            in_use: [false; 256],
            cursor: 0,
        }
    }

    fn acquire(&mut self) -> Option<u8> {
        for _ in 0..256 {
            let candidate = self.cursor;
            self.cursor = (self.cursor + 1) % 256;
            if !self.in_use[candidate] {
                self.in_use[candidate] = true;
                return Some(candidate as u8);
            }
        }
        None
    }

    fn release(&mut self, identifier: u8) {
        self.in_use[identifier as usize] = false;
    }
}

/// Tracks free/in-use RADIUS identifiers per destination endpoint. One
/// instance is shared across a client's outstanding requests; the whole
/// table sits behind a single `Mutex` since each `acquire`/`release` only
/// touches one small bitmap (spec.md §5).
pub struct IdentifierAllocator<Endpoint> {
    slots: Mutex<HashMap<Endpoint, Slots>>,
}

impl<Endpoint: Eq + Hash + Clone> Default for IdentifierAllocator<Endpoint> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Endpoint: Eq + Hash + Clone> IdentifierAllocator<Endpoint> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve an identifier for `endpoint`, returning
    /// [`Error::NoFreeIdentifier`] if all 256 are currently in use.
    pub fn acquire(&self, endpoint: &Endpoint) -> Result<u8, Error> {
        let mut table = self.slots.lock().expect("identifier allocator mutex poisoned");
        let slots = table.entry(endpoint.clone()).or_insert_with(Slots::new);
        slots.acquire().ok_or(Error::NoFreeIdentifier)
    }

    /// Return an identifier to the free pool for `endpoint`. A no-op if the
    /// endpoint has never been seen (e.g. released twice defensively).
    pub fn release(&self, endpoint: &Endpoint, identifier: u8) {
        let mut table = self.slots.lock().expect("identifier allocator mutex poisoned");
        if let Some(slots) = table.get_mut(endpoint) {
            slots.release(identifier);
        }
    }
}
