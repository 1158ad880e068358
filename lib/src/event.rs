// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::ChannelId;
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// The details of an edge detected on an input line.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeEvent {
    /// The line that triggered the event.
    pub channel: ChannelId,

    /// The value of the line after the edge.
    ///
    /// True for a rising edge, false for a falling edge.
    pub value: bool,

    /// The best estimate of time of event occurrence, in nanoseconds,
    /// if the backend provides one.
    ///
    /// The clock source is backend specific, so is left raw here.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "timestampNs", skip_serializing_if = "Option::is_none", default)
    )]
    pub timestamp_ns: Option<u64>,
}

impl EdgeEvent {
    /// Create an event without a timestamp.
    pub fn new<C: Into<ChannelId>>(channel: C, value: bool) -> Self {
        EdgeEvent {
            channel: channel.into(),
            value,
            timestamp_ns: None,
        }
    }

    /// Set the timestamp of the event.
    pub fn with_timestamp(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = Some(timestamp_ns);
        self
    }
}

impl fmt::Display for EdgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Channel {} is at value: {}",
            self.channel,
            u8::from(self.value)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            EdgeEvent::new(3, true).to_string(),
            "Channel 3 is at value: 1"
        );
        assert_eq!(
            EdgeEvent::new("LED0", false).with_timestamp(1234).to_string(),
            "Channel LED0 is at value: 0"
        );
    }

    #[test]
    fn with_timestamp() {
        let ee = EdgeEvent::new(7, false);
        assert_eq!(ee.timestamp_ns, None);
        let ee = ee.with_timestamp(42);
        assert_eq!(ee.timestamp_ns, Some(42));
        assert_eq!(ee.channel, ChannelId::Offset(7));
        assert!(!ee.value);
    }
}
