//! Dense slot table mapping [`Handle`]s to live values.
//!
//! Slots are reused lowest-first. Every reuse bumps the slot's generation, so
//! a token issued for the previous occupant no longer resolves.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::CoreError;
use crate::id::{Handle, ObjectKind};

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot table for one object kind.
#[derive(Debug, Clone)]
pub struct HandleTable<T> {
    kind: ObjectKind,
    slots: Vec<Slot<T>>,
    free: BinaryHeap<Reverse<u32>>,
    live: usize,
}

impl<T> HandleTable<T> {
    pub fn new(kind: ObjectKind) -> Self {
        HandleTable {
            kind,
            slots: Vec::new(),
            free: BinaryHeap::new(),
            live: 0,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Stores `value` in the lowest free slot, growing the table if none is
    /// free, and returns its handle.
    pub fn allocate(&mut self, value: T) -> Handle {
        let slot = match self.free.pop() {
            Some(Reverse(slot)) => {
                let entry = &mut self.slots[slot as usize];
                entry.generation = entry.generation.wrapping_add(1).max(1);
                entry.value = Some(value);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 1,
                    value: Some(value),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.live += 1;
        Handle {
            kind: self.kind,
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }

    /// Looks up the value behind `handle`.
    ///
    /// Fails with [`CoreError::StaleHandle`] when the kind does not match, the
    /// slot is out of range or free, or the slot has since been reused.
    pub fn resolve(&self, handle: Handle) -> Result<&T, CoreError> {
        self.live_slot(handle)
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| CoreError::stale(handle.token()))
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Frees the slot behind `handle` and returns the value it held.
    ///
    /// Releasing a stale handle is a no-op returning `None`.
    pub fn release(&mut self, handle: Handle) -> Option<T> {
        self.live_slot(handle)?;
        let value = self.slots[handle.slot as usize].value.take()?;
        self.free.push(Reverse(handle.slot));
        self.live -= 1;
        Some(value)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over live handles in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        let kind = self.kind;
        self.slots.iter().enumerate().filter_map(move |(slot, entry)| {
            entry.value.as_ref().map(|value| {
                (
                    Handle {
                        kind,
                        slot: slot as u32,
                        generation: entry.generation,
                    },
                    value,
                )
            })
        })
    }

    fn live_slot(&self, handle: Handle) -> Option<&Slot<T>> {
        if handle.kind != self.kind || handle.generation == 0 {
            return None;
        }
        self.slots
            .get(handle.slot as usize)
            .filter(|slot| slot.generation == handle.generation)
    }
}
