// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`Backend`] simulating a chip in memory.
//!
//! The [`Sim`] behaves like a chip with a fixed number of lines, all
//! initially low.  Line levels are driven with [`set_level`] and [`toggle`],
//! which generate edge events on lines configured as inputs with a matching
//! [`EdgeMode`].  Raw events can be placed on the stream with [`inject`].
//!
//! Clones share the same simulated chip, so a clone may be retained to drive
//! lines while the original is owned by a [`Gpio`](crate::Gpio) handle.
//!
//! [`set_level`]: Sim::set_level
//! [`toggle`]: Sim::toggle
//! [`inject`]: Sim::inject

use crate::gpio::lock;
use crate::{Backend, ChannelId, Direction, EdgeEvent, EdgeMode, Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A recorded call to [`Backend::setup`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Setup {
    pub channel: ChannelId,
    pub direction: Direction,
    pub edges: EdgeMode,
}

#[derive(Clone, Copy, Debug)]
struct LineConfig {
    offset: u32,
    direction: Direction,
    edges: EdgeMode,
}

#[derive(Debug)]
struct State {
    num_lines: u32,
    names: HashMap<String, u32>,
    levels: Vec<bool>,
    configured: HashMap<ChannelId, LineConfig>,
    refused: HashSet<ChannelId>,
    pending: VecDeque<EdgeEvent>,
    setups: Vec<Setup>,
    releases: Vec<ChannelId>,
    start: Instant,
}

impl State {
    fn offset(&self, channel: &ChannelId) -> Option<u32> {
        match channel {
            ChannelId::Offset(o) if *o < self.num_lines => Some(*o),
            ChannelId::Offset(_) => None,
            ChannelId::Name(n) => self.names.get(n).copied(),
        }
    }

    fn timestamp(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
}

/// A simulated chip.
#[derive(Clone, Debug)]
pub struct Sim {
    shared: Arc<(Mutex<State>, Condvar)>,
}

impl Sim {
    /// Create a chip with `num_lines` unnamed lines.
    pub fn new(num_lines: u32) -> Self {
        Sim {
            shared: Arc::new((
                Mutex::new(State {
                    num_lines,
                    names: HashMap::new(),
                    levels: vec![false; num_lines as usize],
                    configured: HashMap::new(),
                    refused: HashSet::new(),
                    pending: VecDeque::new(),
                    setups: Vec::new(),
                    releases: Vec::new(),
                    start: Instant::now(),
                }),
                Condvar::new(),
            )),
        }
    }

    /// Name a line.
    ///
    /// Offsets beyond the chip are ignored.
    pub fn with_line_name<N: Into<String>>(self, offset: u32, name: N) -> Self {
        {
            let mut s = lock(&self.shared.0);
            if offset < s.num_lines {
                s.names.insert(name.into(), offset);
            }
        }
        self
    }

    /// Make subsequent setups of the channel fail with [`Error::PermissionDenied`].
    pub fn refuse<C: Into<ChannelId>>(&self, channel: C) {
        lock(&self.shared.0).refused.insert(channel.into());
    }

    /// Drive the level of a line.
    ///
    /// Generates an event if the level changes and the line is configured to
    /// detect that edge.  Unknown lines are ignored.
    pub fn set_level<C: Into<ChannelId>>(&self, channel: C, level: bool) {
        let channel = channel.into();
        let mut s = lock(&self.shared.0);
        let Some(offset) = s.offset(&channel) else {
            log::debug!("sim: ignoring level for unknown line {}", channel);
            return;
        };
        if s.levels[offset as usize] == level {
            return;
        }
        s.levels[offset as usize] = level;
        let timestamp = s.timestamp();
        let watched: Vec<ChannelId> = s
            .configured
            .iter()
            .filter(|(_, lc)| {
                lc.offset == offset
                    && lc.direction == Direction::Input
                    && lc.edges.detects(level)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in watched {
            s.pending
                .push_back(EdgeEvent::new(id, level).with_timestamp(timestamp));
        }
        self.shared.1.notify_all();
    }

    /// Invert the level of a line, returning the new level.
    ///
    /// Returns `None` for unknown lines.
    pub fn toggle<C: Into<ChannelId>>(&self, channel: C) -> Option<bool> {
        let channel = channel.into();
        let level = {
            let s = lock(&self.shared.0);
            !s.levels[s.offset(&channel)? as usize]
        };
        self.set_level(channel, level);
        Some(level)
    }

    /// The current level of a line.
    pub fn level<C: Into<ChannelId>>(&self, channel: C) -> Option<bool> {
        let s = lock(&self.shared.0);
        s.offset(&channel.into()).map(|o| s.levels[o as usize])
    }

    /// Place an event on the event stream, whether or not its channel is configured.
    pub fn inject(&self, event: EdgeEvent) {
        lock(&self.shared.0).pending.push_back(event);
        self.shared.1.notify_all();
    }

    /// The successful setups, in order.
    pub fn setups(&self) -> Vec<Setup> {
        lock(&self.shared.0).setups.clone()
    }

    /// The released channels, in order.
    pub fn releases(&self) -> Vec<ChannelId> {
        lock(&self.shared.0).releases.clone()
    }
}

impl Backend for Sim {
    fn setup(&mut self, channel: &ChannelId, direction: Direction, edges: EdgeMode) -> Result<()> {
        let mut s = lock(&self.shared.0);
        let offset = s
            .offset(channel)
            .ok_or_else(|| Error::NoSuchLine(channel.clone()))?;
        if s.refused.contains(channel) {
            return Err(Error::PermissionDenied(channel.clone()));
        }
        if s.configured.values().any(|lc| lc.offset == offset) {
            return Err(Error::Busy(channel.clone()));
        }
        s.configured.insert(
            channel.clone(),
            LineConfig {
                offset,
                direction,
                edges,
            },
        );
        s.setups.push(Setup {
            channel: channel.clone(),
            direction,
            edges,
        });
        log::debug!("sim: setup line {} as {} with {} edges", channel, direction, edges);
        Ok(())
    }

    fn release(&mut self, channel: &ChannelId) -> Result<()> {
        let mut s = lock(&self.shared.0);
        if s.configured.remove(channel).is_some() {
            s.releases.push(channel.clone());
            log::debug!("sim: released line {}", channel);
        }
        Ok(())
    }

    fn read_events(&mut self, timeout: Option<Duration>) -> Result<Option<Vec<EdgeEvent>>> {
        let (state, cond) = &*self.shared;
        let mut s = lock(state);
        match timeout {
            None => {
                while s.pending.is_empty() {
                    s = cond.wait(s).unwrap_or_else(|e| e.into_inner());
                }
            }
            Some(timeout) => {
                s = cond
                    .wait_timeout_while(s, timeout, |s| s.pending.is_empty())
                    .map(|(s, _)| s)
                    .unwrap_or_else(|e| e.into_inner().0);
            }
        }
        if s.pending.is_empty() {
            return Ok(None);
        }
        Ok(Some(s.pending.drain(..).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod setup {
        use super::*;

        #[test]
        fn records() {
            let mut sim = Sim::new(4);
            sim.setup(&ChannelId::Offset(1), Direction::Input, EdgeMode::Rising)
                .expect("setup should succeed");
            assert_eq!(
                sim.setups(),
                vec![Setup {
                    channel: ChannelId::Offset(1),
                    direction: Direction::Input,
                    edges: EdgeMode::Rising,
                }]
            );
        }

        #[test]
        fn no_such_line() {
            let mut sim = Sim::new(4).with_line_name(9, "BEYOND");
            let e = sim
                .setup(&ChannelId::Offset(4), Direction::Input, EdgeMode::Both)
                .expect_err("setup should fail");
            assert!(matches!(e, Error::NoSuchLine(ChannelId::Offset(4))));
            let e = sim
                .setup(&ChannelId::from("BEYOND"), Direction::Input, EdgeMode::Both)
                .expect_err("setup should fail");
            assert!(matches!(e, Error::NoSuchLine(_)));
            assert!(sim.setups().is_empty());
        }

        #[test]
        fn busy() {
            let mut sim = Sim::new(4).with_line_name(2, "BUTTON");
            sim.setup(&ChannelId::Offset(2), Direction::Input, EdgeMode::Both)
                .expect("setup should succeed");
            let e = sim
                .setup(&ChannelId::from("BUTTON"), Direction::Input, EdgeMode::Both)
                .expect_err("setup should fail");
            assert!(matches!(e, Error::Busy(_)));
        }

        #[test]
        fn refused() {
            let mut sim = Sim::new(4);
            sim.refuse(0);
            let e = sim
                .setup(&ChannelId::Offset(0), Direction::Input, EdgeMode::Both)
                .expect_err("setup should fail");
            assert!(matches!(e, Error::PermissionDenied(ChannelId::Offset(0))));
        }
    }

    mod events {
        use super::*;

        #[test]
        fn edge_filtering() {
            let mut sim = Sim::new(4);
            sim.setup(&ChannelId::Offset(1), Direction::Input, EdgeMode::Rising)
                .expect("setup should succeed");
            sim.setup(&ChannelId::Offset(2), Direction::Output, EdgeMode::None)
                .expect("setup should succeed");
            assert_eq!(sim.toggle(1), Some(true));
            assert_eq!(sim.toggle(1), Some(false));
            assert_eq!(sim.toggle(2), Some(true));
            assert_eq!(sim.toggle(3), Some(true));
            let events = sim
                .read_events(Some(Duration::ZERO))
                .expect("read should succeed")
                .expect("read should not time out");
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].channel, ChannelId::Offset(1));
            assert!(events[0].value);
            assert!(events[0].timestamp_ns.is_some());
        }

        #[test]
        fn unchanged_level() {
            let mut sim = Sim::new(4);
            sim.setup(&ChannelId::Offset(0), Direction::Input, EdgeMode::Both)
                .expect("setup should succeed");
            sim.set_level(0, false);
            sim.set_level(0, true);
            sim.set_level(0, true);
            assert_eq!(sim.level(0), Some(true));
            assert_eq!(sim.level(7), None);
            let events = sim
                .read_events(Some(Duration::ZERO))
                .expect("read should succeed")
                .expect("read should not time out");
            assert_eq!(events.len(), 1);
        }

        #[test]
        fn named_line() {
            let mut sim = Sim::new(4).with_line_name(3, "LED0");
            sim.setup(&ChannelId::from("LED0"), Direction::Input, EdgeMode::Both)
                .expect("setup should succeed");
            sim.set_level(3, true);
            let events = sim
                .read_events(Some(Duration::ZERO))
                .expect("read should succeed")
                .expect("read should not time out");
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].channel, ChannelId::from("LED0"));
        }

        #[test]
        fn released_line() {
            let mut sim = Sim::new(4);
            let ch = ChannelId::Offset(1);
            sim.setup(&ch, Direction::Input, EdgeMode::Both)
                .expect("setup should succeed");
            sim.release(&ch).expect("release should succeed");
            sim.release(&ch).expect("release should succeed");
            assert_eq!(sim.releases(), vec![ch]);
            sim.toggle(1);
            let events = sim
                .read_events(Some(Duration::from_millis(1)))
                .expect("read should succeed");
            assert_eq!(events, None);
        }

        #[test]
        fn blocking_read() {
            let mut sim = Sim::new(4);
            let driver = sim.clone();
            let t = std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                driver.inject(EdgeEvent::new(2, true));
            });
            let events = sim.read_events(None).expect("read should succeed");
            assert_eq!(events, Some(vec![EdgeEvent::new(2, true)]));
            t.join().expect("driver should not panic");
        }
    }
}
