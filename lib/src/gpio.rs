// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{Backend, ChannelId, EdgeEvent, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub(crate) type Handler = Box<dyn FnMut(EdgeEvent) + Send>;

/// The dispatch state for a bound channel.
pub(crate) struct Slot {
    pub(crate) bound: bool,
    pub(crate) handler: Option<Handler>,
}

pub(crate) struct Shared<B> {
    // lock order is table then backend
    pub(crate) table: Mutex<HashMap<ChannelId, Arc<Mutex<Slot>>>>,
    pub(crate) backend: Mutex<B>,
}

/// An explicit handle to the GPIO hardware.
///
/// The handle owns the [`Backend`] and a dispatch table that routes each edge
/// event from the backend to the [`EdgeWatcher`] bound to its channel.
///
/// Clones refer to the same backend and dispatch table.
///
/// [`EdgeWatcher`]: crate::EdgeWatcher
pub struct Gpio<B: Backend> {
    pub(crate) shared: Arc<Shared<B>>,
}

impl<B: Backend> Clone for Gpio<B> {
    fn clone(&self) -> Self {
        Gpio {
            shared: self.shared.clone(),
        }
    }
}

impl<B: Backend> Gpio<B> {
    /// Create a handle owning the backend.
    pub fn new(backend: B) -> Self {
        Gpio {
            shared: Arc::new(Shared {
                table: Mutex::new(HashMap::new()),
                backend: Mutex::new(backend),
            }),
        }
    }

    /// Wait for edge events and dispatch them to the bound watchers.
    ///
    /// Blocks until the backend has events or until the `timeout` expires.
    /// A `None` timeout blocks indefinitely.
    ///
    /// Events are delivered in the order the backend reports them.
    /// Events for channels without a bound watcher, or for watchers without a
    /// handler, are dropped.
    ///
    /// Returns the number of events delivered to handlers, or `None` if the
    /// `timeout` expired without the backend reporting any activity.
    /// The backend may report activity without events, so `Some(0)` does not
    /// imply the `timeout` expired.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Option<usize>> {
        let Some(events) = self.lock_backend().read_events(timeout)? else {
            return Ok(None);
        };
        let mut delivered = 0;
        for event in events {
            if self.dispatch(event) {
                delivered += 1;
            }
        }
        Ok(Some(delivered))
    }

    /// Run a function with access to the backend.
    pub fn backend<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut B) -> R,
    {
        f(&mut self.lock_backend())
    }

    /// Returns true if a watcher is bound to the channel.
    pub fn is_bound(&self, channel: &ChannelId) -> bool {
        self.lock_table().contains_key(channel)
    }

    fn dispatch(&self, event: EdgeEvent) -> bool {
        // table lock must not be held while the handler runs
        let slot = self.lock_table().get(&event.channel).cloned();
        let Some(slot) = slot else {
            log::trace!("dropping event for unbound channel {}", event.channel);
            return false;
        };
        let mut slot = lock(&slot);
        if !slot.bound {
            log::trace!("dropping event for unbinding channel {}", event.channel);
            return false;
        }
        match slot.handler.as_mut() {
            Some(handler) => {
                handler(event);
                true
            }
            None => {
                log::trace!("dropping event for channel {} with no handler", event.channel);
                false
            }
        }
    }

    pub(crate) fn lock_table(&self) -> MutexGuard<'_, HashMap<ChannelId, Arc<Mutex<Slot>>>> {
        lock(&self.shared.table)
    }

    pub(crate) fn lock_backend(&self) -> MutexGuard<'_, B> {
        lock(&self.shared.backend)
    }
}

// ignores poisoning by panicking handlers
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
