//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zi.
//! The Zi project belongs to the Dunimd project team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Execution Gate Module
//!
//! Grants exclusive access to the foreign environment, one permit at a time.
//! Waiters sleep on a condition variable until the permit is released or
//! their deadline passes. A thread that already holds the permit is refused
//! instead of deadlocking on itself.

use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;

/// Why a permit was not granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IjGateRefusal {
    /// The calling thread already holds the permit.
    Reentrant,
    /// The deadline passed while waiting.
    TimedOut,
}

#[derive(Debug, Default)]
pub struct IjExecutionGate {
    holder: Mutex<Option<ThreadId>>,
    released: Condvar,
}

impl IjExecutionGate {
    #[allow(non_snake_case)]
    pub fn new() -> Self {
        IjExecutionGate::default()
    }

    /// Blocks until the permit is free, then takes it.
    pub fn acquire(&self, deadline: Option<Instant>) -> Result<IjExecutionPermit<'_>, IjGateRefusal> {
        let me = thread::current().id();
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *holder {
                None => {
                    *holder = Some(me);
                    return Ok(IjExecutionPermit { gate: self });
                }
                Some(owner) if owner == me => return Err(IjGateRefusal::Reentrant),
                Some(_) => {}
            }
            holder = match deadline {
                None => self
                    .released
                    .wait(holder)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(IjGateRefusal::TimedOut);
                    }
                    self.released
                        .wait_timeout(holder, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    pub fn is_held(&self) -> bool {
        self.holder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread::current().id())
    }

    fn release(&self) {
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        *holder = None;
        drop(holder);
        self.released.notify_one();
    }
}

/// Exclusive access to the foreign environment. Released on drop, also when
/// the holder unwinds.
#[derive(Debug)]
pub struct IjExecutionPermit<'a> {
    gate: &'a IjExecutionGate,
}

impl Drop for IjExecutionPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
