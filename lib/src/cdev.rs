// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{Backend, ChannelId, Direction, EdgeEvent, EdgeMode, Error, Result};
use gpiocdev::line::{Bias, EdgeDetection, EdgeKind, Value};
use gpiocdev::request::Request;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use std::os::unix::prelude::AsRawFd;
use std::path::PathBuf;
use std::time::Duration;

/// The configuration applied to lines requested by a [`Cdev`] backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CdevConfig {
    /// The chip lines identified by offset are requested from.
    ///
    /// Lines identified by name are searched for on all chips.
    pub chip: PathBuf,

    /// The consumer label applied to requested lines.
    pub consumer: String,

    /// The bias applied to input lines, or `None` to leave it unchanged.
    pub bias: Option<Bias>,

    /// Treat lines as active-low.
    pub active_low: bool,

    /// The debounce period applied to input lines.
    pub debounce_period: Option<Duration>,
}

impl Default for CdevConfig {
    fn default() -> Self {
        CdevConfig {
            chip: "/dev/gpiochip0".into(),
            consumer: "watch-pin".into(),
            bias: None,
            active_low: false,
            debounce_period: None,
        }
    }
}

impl CdevConfig {
    /// Set the chip used for lines identified by offset.
    pub fn on_chip<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.chip = path.into();
        self
    }

    /// Set the consumer label.
    pub fn with_consumer<N: Into<String>>(&mut self, consumer: N) -> &mut Self {
        self.consumer = consumer.into();
        self
    }

    /// Set the bias of input lines.
    pub fn with_bias<B: Into<Option<Bias>>>(&mut self, bias: B) -> &mut Self {
        self.bias = bias.into();
        self
    }

    /// Treat lines as active-low.
    pub fn as_active_low(&mut self) -> &mut Self {
        self.active_low = true;
        self
    }

    /// Set the debounce period of input lines.
    ///
    /// A zero period disables debouncing.
    pub fn with_debounce_period(&mut self, period: Duration) -> &mut Self {
        self.debounce_period = if period.is_zero() { None } else { Some(period) };
        self
    }
}

struct Line {
    channel: ChannelId,
    req: Request,
}

/// A [`Backend`] that requests lines from the Linux GPIO character device.
///
/// Each configured channel is a separate line request, and all requests are
/// polled together to provide the event stream.
pub struct Cdev {
    config: CdevConfig,
    poll: Poll,
    events: Events,
    // indexed by poll token
    lines: Vec<Option<Line>>,
}

impl Cdev {
    /// Create a backend applying the configuration to all requested lines.
    pub fn new(config: CdevConfig) -> Result<Self> {
        let poll = Poll::new().map_err(Error::Poll)?;
        Ok(Cdev {
            config,
            poll,
            events: Events::with_capacity(16),
            lines: Vec::new(),
        })
    }

    /// The configuration applied to requested lines.
    pub fn config(&self) -> &CdevConfig {
        &self.config
    }

    fn index_of(&self, channel: &ChannelId) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.as_ref().is_some_and(|l| &l.channel == channel))
    }

    fn request(&self, channel: &ChannelId, direction: Direction, edges: EdgeMode) -> Result<Request> {
        let mut bld = Request::builder();
        match channel {
            ChannelId::Offset(offset) => {
                bld.on_chip(&self.config.chip).with_line(*offset);
            }
            ChannelId::Name(name) => {
                let fl = gpiocdev::find_named_line(name)
                    .ok_or_else(|| Error::NoSuchLine(channel.clone()))?;
                bld.with_found_line(&fl);
            }
        }
        bld.with_consumer(self.config.consumer.as_str());
        if self.config.active_low {
            bld.as_active_low();
        }
        match direction {
            Direction::Input => {
                bld.as_input()
                    .with_bias(self.config.bias)
                    .with_edge_detection(edge_detection(edges));
                if let Some(period) = self.config.debounce_period {
                    bld.with_debounce_period(period);
                }
            }
            Direction::Output => {
                bld.as_output(Value::Inactive);
            }
        }
        Ok(bld.request()?)
    }
}

impl Backend for Cdev {
    fn setup(&mut self, channel: &ChannelId, direction: Direction, edges: EdgeMode) -> Result<()> {
        if self.index_of(channel).is_some() {
            return Err(Error::Busy(channel.clone()));
        }
        let req = self.request(channel, direction, edges)?;
        let idx = match self.lines.iter().position(Option::is_none) {
            Some(idx) => idx,
            None => {
                self.lines.push(None);
                self.lines.len() - 1
            }
        };
        self.poll
            .registry()
            .register(
                &mut SourceFd(&req.as_raw_fd()),
                Token(idx),
                Interest::READABLE,
            )
            .map_err(Error::Poll)?;
        log::debug!(
            "requested line {} as {} with {} edges from {}",
            channel,
            direction,
            edges,
            req.chip_path().display()
        );
        self.lines[idx] = Some(Line {
            channel: channel.clone(),
            req,
        });
        Ok(())
    }

    fn release(&mut self, channel: &ChannelId) -> Result<()> {
        let Some(line) = self.index_of(channel).and_then(|idx| self.lines[idx].take()) else {
            return Ok(());
        };
        log::debug!("releasing line {}", channel);
        // the request is closed when the line drops
        self.poll
            .registry()
            .deregister(&mut SourceFd(&line.req.as_raw_fd()))
            .map_err(Error::Poll)
    }

    fn read_events(&mut self, timeout: Option<Duration>) -> Result<Option<Vec<EdgeEvent>>> {
        if let Err(e) = self.poll.poll(&mut self.events, timeout) {
            if e.kind() == std::io::ErrorKind::Interrupted {
                return Ok(Some(Vec::new()));
            }
            return Err(Error::Poll(e));
        }
        if self.events.is_empty() {
            return Ok(None);
        }
        let mut edges = Vec::new();
        for event in &self.events {
            let Token(idx) = event.token();
            let Some(line) = self.lines.get(idx).and_then(Option::as_ref) else {
                continue;
            };
            while line.req.has_edge_event()? {
                let ee = line.req.read_edge_event()?;
                edges.push(edge_from_cdev(&line.channel, &ee));
            }
        }
        Ok(Some(edges))
    }
}

fn edge_detection(edges: EdgeMode) -> Option<EdgeDetection> {
    match edges {
        EdgeMode::None => None,
        EdgeMode::Rising => Some(EdgeDetection::RisingEdge),
        EdgeMode::Falling => Some(EdgeDetection::FallingEdge),
        EdgeMode::Both => Some(EdgeDetection::BothEdges),
    }
}

fn edge_from_cdev(channel: &ChannelId, ee: &gpiocdev::line::EdgeEvent) -> EdgeEvent {
    EdgeEvent::new(channel.clone(), ee.kind == EdgeKind::Rising).with_timestamp(ee.timestamp_ns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default() {
        let cfg = CdevConfig::default();
        assert_eq!(cfg.chip, PathBuf::from("/dev/gpiochip0"));
        assert_eq!(cfg.consumer, "watch-pin");
        assert_eq!(cfg.bias, None);
        assert!(!cfg.active_low);
        assert_eq!(cfg.debounce_period, None);
    }

    #[test]
    fn config_mutators() {
        let mut cfg = CdevConfig::default();
        cfg.on_chip("/dev/gpiochip1")
            .with_consumer("test")
            .with_bias(Bias::PullUp)
            .as_active_low()
            .with_debounce_period(Duration::from_millis(5));
        assert_eq!(cfg.chip, PathBuf::from("/dev/gpiochip1"));
        assert_eq!(cfg.consumer, "test");
        assert_eq!(cfg.bias, Some(Bias::PullUp));
        assert!(cfg.active_low);
        assert_eq!(cfg.debounce_period, Some(Duration::from_millis(5)));
        cfg.with_debounce_period(Duration::ZERO).with_bias(None);
        assert_eq!(cfg.debounce_period, None);
        assert_eq!(cfg.bias, None);
    }

    #[test]
    fn edge_detection_mapping() {
        assert_eq!(edge_detection(EdgeMode::None), None);
        assert_eq!(
            edge_detection(EdgeMode::Rising),
            Some(EdgeDetection::RisingEdge)
        );
        assert_eq!(
            edge_detection(EdgeMode::Falling),
            Some(EdgeDetection::FallingEdge)
        );
        assert_eq!(
            edge_detection(EdgeMode::Both),
            Some(EdgeDetection::BothEdges)
        );
    }

    #[test]
    fn edge_conversion() {
        let mut ee = gpiocdev::line::EdgeEvent {
            timestamp_ns: 1234,
            kind: EdgeKind::Rising,
            offset: 3,
            seqno: 1,
            line_seqno: 1,
        };
        let ch = ChannelId::Offset(3);
        assert_eq!(
            edge_from_cdev(&ch, &ee),
            EdgeEvent::new(3, true).with_timestamp(1234)
        );
        ee.kind = EdgeKind::Falling;
        assert_eq!(
            edge_from_cdev(&ChannelId::from("BUTTON"), &ee),
            EdgeEvent::new("BUTTON", false).with_timestamp(1234)
        );
    }

    #[test]
    fn new() {
        let mut cfg = CdevConfig::default();
        cfg.with_consumer("new").as_active_low();
        let cdev = Cdev::new(cfg.clone()).expect("poll should be available");
        assert_eq!(cdev.config(), &cfg);
    }

    #[test]
    fn release_unknown() {
        let mut cdev = Cdev::new(CdevConfig::default()).expect("poll should be available");
        cdev.release(&ChannelId::Offset(3))
            .expect("release of unknown line should succeed");
        let events = cdev
            .read_events(Some(Duration::ZERO))
            .expect("read should succeed");
        assert_eq!(events, None);
    }
}
