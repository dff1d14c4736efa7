// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A small ring buffer for recording the most recent events in a fixed
//! window, adapted from the teacher repository's `ringbuf` crate for a
//! single-threaded cooperative scheduler: there is no interrupt context and
//! no cross-core contention here, so the synchronization machinery that
//! `ringbuf` needs on a preemptible microcontroller is unnecessary — a plain
//! owned struct is enough.
//!
//! Event de-duplication (repeating the same payload at the same call site
//! just bumps a count instead of consuming a new slot) is preserved because
//! it's what makes a small ring buffer useful for things like "every
//! TIMEOUT on the mandatory status cycle", which would otherwise evict
//! everything else within a few seconds.

#![no_std]

#[cfg(test)]
extern crate std;

/// One recorded event: its call-site tag, payload, and how many times it
/// repeated back-to-back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    pub tag: &'static str,
    pub payload: T,
    pub count: u32,
}

/// A fixed-capacity ring buffer of the `N` most recent distinct events.
#[derive(Debug)]
pub struct Ringbuf<T, const N: usize> {
    entries: [Option<Entry<T>>; N],
    next: usize,
}

impl<T: Copy + PartialEq, const N: usize> Default for Ringbuf<T, N> {
    fn default() -> Self {
        Self {
            entries: [None; N],
            next: 0,
        }
    }
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new() -> Self {
        Self {
            entries: [None; N],
            next: 0,
        }
    }

    /// Records `payload` tagged with `tag` (conventionally `concat!(file!(),
    /// ":", line!())` via [`ringbuf_entry!`]). If the most recent entry has
    /// the same tag and payload, its count is incremented instead of
    /// allocating a new slot.
    pub fn push(&mut self, tag: &'static str, payload: T) {
        if N == 0 {
            return;
        }
        let last_index = (self.next + N - 1) % N;
        if let Some(last) = &mut self.entries[last_index] {
            if last.tag == tag && last.payload == payload {
                last.count += 1;
                return;
            }
        }
        self.entries[self.next] = Some(Entry {
            tag,
            payload,
            count: 1,
        });
        self.next = (self.next + 1) % N;
    }

    /// Iterates recorded entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<T>> {
        (0..N)
            .map(move |i| &self.entries[(self.next + i) % N])
            .filter_map(|slot| slot.as_ref())
    }

    pub fn last(&self) -> Option<&Entry<T>> {
        self.iter().last()
    }
}

/// Records `payload` into `buf` tagged with the current source location.
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {
        $buf.push(concat!(file!(), ":", line!()), $payload)
    };
}

/// A monotonically-counted occurrence total per named event kind, the way
/// the teacher's `counters` crate tracks "how many times has X happened"
/// independent of the bounded ring buffer above (which only remembers the
/// last `N`). `E` is typically a fieldless enum naming the kinds of event;
/// `Count::COUNT` fixes its cardinality.
pub trait Count: Copy {
    const COUNT: usize;
    fn index(self) -> usize;
}

#[derive(Debug)]
pub struct Counters<E: Count, const N: usize> {
    totals: [u32; N],
    _marker: core::marker::PhantomData<E>,
}

impl<E: Count, const N: usize> Default for Counters<E, N> {
    fn default() -> Self {
        // Asserting N == E::COUNT at construction keeps the const generic
        // and the trait's associated constant from silently drifting apart.
        assert!(N == E::COUNT);
        Self {
            totals: [0; N],
            _marker: core::marker::PhantomData,
        }
    }
}

impl<E: Count, const N: usize> Counters<E, N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&mut self, event: E) {
        self.totals[event.index()] += 1;
    }

    pub fn get(&self, event: E) -> u32 {
        self.totals[event.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_repeated_entries() {
        let mut buf: Ringbuf<u8, 4> = Ringbuf::new();
        ringbuf_entry!(buf, 1u8);
        ringbuf_entry!(buf, 1u8);
        ringbuf_entry!(buf, 1u8);
        assert_eq!(buf.iter().count(), 1);
        assert_eq!(buf.last().unwrap().count, 3);
    }

    #[test]
    fn wraps_after_capacity() {
        let mut buf: Ringbuf<u8, 2> = Ringbuf::new();
        ringbuf_entry!(buf, 1u8);
        ringbuf_entry!(buf, 2u8);
        ringbuf_entry!(buf, 3u8);
        let payloads: std::vec::Vec<_> = buf.iter().map(|e| e.payload).collect();
        assert_eq!(&*payloads, &[2, 3]);
    }

    #[derive(Copy, Clone)]
    enum Event {
        Timeout,
        ParityError,
    }

    impl Count for Event {
        const COUNT: usize = 2;
        fn index(self) -> usize {
            self as usize
        }
    }

    #[test]
    fn counters_tally_by_variant() {
        let mut c: Counters<Event, 2> = Counters::new();
        c.bump(Event::Timeout);
        c.bump(Event::Timeout);
        c.bump(Event::ParityError);
        assert_eq!(c.get(Event::Timeout), 2);
        assert_eq!(c.get(Event::ParityError), 1);
    }
}
