// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::gpio::{lock, Slot};
use crate::{Backend, ChannelId, Direction, EdgeEvent, EdgeMode, Error, Gpio, Result};
use std::sync::{Arc, Mutex};

/// Watches a single input line for edges.
///
/// Binding the watcher configures the line as an input with both edges
/// detected.  Edges on the line are then delivered to the handler registered
/// with [`on_edge`] as the [`Gpio`] handle dispatches them.
///
/// Only one watcher may be bound to a given channel on a handle.
/// The line is released when the watcher is unbound or dropped.
///
/// [`on_edge`]: #method.on_edge
pub struct EdgeWatcher<B: Backend> {
    gpio: Gpio<B>,
    channel: ChannelId,
    slot: Arc<Mutex<Slot>>,
    bound: bool,
}

impl<B: Backend> EdgeWatcher<B> {
    /// Bind a watcher to the channel.
    ///
    /// The channel is validated, and checked to not already be bound, before
    /// the backend is asked to configure the line.
    pub fn bind<C: Into<ChannelId>>(gpio: &Gpio<B>, channel: C) -> Result<Self> {
        let channel = channel.into();
        channel.validate()?;
        let mut table = gpio.lock_table();
        if table.contains_key(&channel) {
            return Err(Error::AlreadyBound(channel));
        }
        gpio.lock_backend()
            .setup(&channel, Direction::Input, EdgeMode::Both)?;
        let slot = Arc::new(Mutex::new(Slot {
            bound: true,
            handler: None,
        }));
        table.insert(channel.clone(), slot.clone());
        log::debug!("bound channel {}", channel);
        Ok(EdgeWatcher {
            gpio: gpio.clone(),
            channel,
            slot,
            bound: true,
        })
    }

    /// Set the handler called for each edge on the channel.
    ///
    /// Replaces any previously set handler.
    /// Invocations of the handler never overlap.
    pub fn on_edge<F>(&mut self, handler: F)
    where
        F: FnMut(EdgeEvent) + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        if slot.handler.is_some() {
            log::debug!("replacing handler for channel {}", self.channel);
        }
        slot.handler = Some(Box::new(handler));
    }

    /// Unbind the watcher and release the line.
    ///
    /// No events are delivered to the handler after this returns.
    /// Calling this on an unbound watcher does nothing.
    ///
    /// Releasing the line requires the backend, so this blocks while another
    /// thread is inside [`Gpio::wait`], until that wait returns.  With a `None`
    /// timeout that wait, and so this call, may block indefinitely if no events
    /// arrive.  Threads dispatching while watchers are unbound elsewhere should
    /// wait with a finite timeout.
    ///
    /// Must not be called from within the watcher's own handler.
    pub fn unbind(&mut self) -> Result<()> {
        if !self.bound {
            return Ok(());
        }
        self.bound = false;
        {
            // waits for any in-flight handler to return
            let mut slot = lock(&self.slot);
            slot.bound = false;
            slot.handler = None;
        }
        let mut table = self.gpio.lock_table();
        table.remove(&self.channel);
        log::debug!("unbound channel {}", self.channel);
        self.gpio.lock_backend().release(&self.channel)
    }

    /// The channel the watcher is bound to.
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Returns true until the watcher is unbound.
    pub fn is_bound(&self) -> bool {
        self.bound
    }
}

/// Dropping a bound watcher unbinds it, and so blocks as [`unbind`] does.
///
/// [`unbind`]: EdgeWatcher::unbind
impl<B: Backend> Drop for EdgeWatcher<B> {
    fn drop(&mut self) {
        if let Err(e) = self.unbind() {
            log::warn!("failed to release channel {}: {}", self.channel, e);
        }
    }
}
