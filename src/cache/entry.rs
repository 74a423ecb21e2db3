//! Cache Entry Module
//!
//! Defines a stored value together with its deadline and pending expiry timer.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value, its deadline and the handle of its expiry timer.
///
/// Dropping the entry drops the handle, which cancels the timer.
#[derive(Debug)]
pub struct CacheEntry<H> {
    /// The stored bytes
    pub value: Vec<u8>,
    /// Deadline, None when `now + ttl` is not representable
    pub expires_at: Option<Instant>,
    /// Write generation checked by the timer before it removes the entry
    pub generation: u64,
    /// Pending expiry timer, held only to be dropped with the entry
    _timer: H,
}

impl<H> CacheEntry<H> {
    // == Constructor ==
    /// Creates an entry that expires `ttl` from now.
    ///
    /// # Arguments
    /// * `value` - The bytes to store
    /// * `ttl` - Time to live
    /// * `generation` - Write generation of this entry
    /// * `timer` - Handle of the timer scheduled for this entry
    pub fn new(value: Vec<u8>, ttl: Duration, generation: u64, timer: H) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
            generation,
            _timer: timer,
        }
    }

    // == Is Expired ==
    /// Checks if the deadline has passed.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its deadline, whether or not its timer has fired yet.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining time to live, zero once expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
