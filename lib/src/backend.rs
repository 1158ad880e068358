// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{ChannelId, EdgeEvent, Result};
use std::fmt;
use std::time::Duration;

/// The direction of a line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    /// The line is an input.
    #[default]
    Input,

    /// The line is an output.
    Output,
}

/// The edges of a line that generate events.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EdgeMode {
    /// Edge detection is disabled.
    #[default]
    None,

    /// Transitions from inactive to active generate events.
    Rising,

    /// Transitions from active to inactive generate events.
    Falling,

    /// Transitions in either direction generate events.
    Both,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

impl fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeMode::None => "none",
            EdgeMode::Rising => "rising",
            EdgeMode::Falling => "falling",
            EdgeMode::Both => "both",
        };
        write!(f, "{}", name)
    }
}

impl EdgeMode {
    /// Returns true if a transition to `value` generates an event.
    pub fn detects(&self, value: bool) -> bool {
        match self {
            EdgeMode::None => false,
            EdgeMode::Rising => value,
            EdgeMode::Falling => !value,
            EdgeMode::Both => true,
        }
    }
}

/// The hardware side of a [`Gpio`](crate::Gpio) handle.
///
/// A backend configures lines and provides a single stream of edge events
/// for all the lines it has configured.  The stream is not filtered by
/// channel - that is the job of the dispatch table in the handle.
pub trait Backend {
    /// Configure the line identified by `channel`.
    ///
    /// On error the line is left unconfigured.
    fn setup(&mut self, channel: &ChannelId, direction: Direction, edges: EdgeMode) -> Result<()>;

    /// Release a line previously configured by [`setup`](Backend::setup).
    fn release(&mut self, channel: &ChannelId) -> Result<()>;

    /// Read the events available from all configured lines.
    ///
    /// Blocks until at least one event is available, or until the `timeout`
    /// expires, in which case `None` is returned.
    /// A `None` timeout blocks indefinitely.
    ///
    /// A backend may return an empty batch before the `timeout` expires,
    /// such as when the wait is interrupted by a signal.
    fn read_events(&mut self, timeout: Option<Duration>) -> Result<Option<Vec<EdgeEvent>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_mode_detects() {
        assert!(!EdgeMode::None.detects(true));
        assert!(!EdgeMode::None.detects(false));
        assert!(EdgeMode::Rising.detects(true));
        assert!(!EdgeMode::Rising.detects(false));
        assert!(!EdgeMode::Falling.detects(true));
        assert!(EdgeMode::Falling.detects(false));
        assert!(EdgeMode::Both.detects(true));
        assert!(EdgeMode::Both.detects(false));
    }

    #[test]
    fn defaults() {
        assert_eq!(Direction::default(), Direction::Input);
        assert_eq!(EdgeMode::default(), EdgeMode::None);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Direction::Input), "input");
        assert_eq!(format!("{}", Direction::Output), "output");
        assert_eq!(format!("{}", EdgeMode::Both), "both");
        assert_eq!(format!("{}", EdgeMode::Falling), "falling");
    }
}
