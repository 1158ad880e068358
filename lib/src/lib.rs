// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A library for watching a GPIO input line for edge events.
//!
//! A [`Gpio`] handle owns a [`Backend`], which configures the hardware and
//! provides the stream of edges for all configured lines, and a dispatch
//! table which routes each edge to the [`EdgeWatcher`] bound to its channel.
//!
//! To watch line 3 on the default chip:
//! ```no_run
//! # #[cfg(feature = "cdev")]
//! # fn main() -> gpiowatch::Result<()> {
//! use gpiowatch::cdev::{Cdev, CdevConfig};
//! use gpiowatch::{EdgeWatcher, Gpio};
//!
//! let gpio = Gpio::new(Cdev::new(CdevConfig::default())?);
//! let mut watcher = EdgeWatcher::bind(&gpio, 3)?;
//! watcher.on_edge(|event| println!("{event}"));
//! loop {
//!     gpio.wait(None)?;
//! }
//! # }
//! # #[cfg(not(feature = "cdev"))]
//! # fn main() {}
//! ```
//!
//! The [`sim`] backend provides the same contract in memory, for hosts
//! without GPIO hardware.
//!
//! [`sim`]: module@sim

/// The hardware abstraction used by a [`Gpio`] handle.
pub mod backend;
pub use backend::{Backend, Direction, EdgeMode};

/// A backend using the Linux GPIO character device.
#[cfg(feature = "cdev")]
pub mod cdev;

mod channel;
pub use channel::ChannelId;

mod event;
pub use event::EdgeEvent;

mod gpio;
pub use gpio::Gpio;

pub mod sim;

mod watcher;
pub use watcher::EdgeWatcher;

/// Errors returned by [`gpiowatch`] functions.
///
/// [`gpiowatch`]: crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The channel identifier cannot name a line.
    #[error("invalid channel identifier '{0}'")]
    InvalidChannel(String),

    /// A watcher is already bound to the channel.
    #[error("channel {0} is already bound")]
    AlreadyBound(ChannelId),

    /// The backend has no line matching the channel.
    #[error("cannot find line {0}")]
    NoSuchLine(ChannelId),

    /// The line is already in use.
    #[error("line {0} is busy")]
    Busy(ChannelId),

    /// The backend refused access to the line.
    #[error("permission denied for line {0}")]
    PermissionDenied(ChannelId),

    /// An error returned from the GPIO character device.
    #[cfg(feature = "cdev")]
    #[error(transparent)]
    Cdev(#[from] gpiocdev::Error),

    /// An error returned while polling for events.
    #[error("poll failed")]
    Poll(#[source] std::io::Error),
}

/// The result for [`gpiowatch`] functions.
///
/// [`gpiowatch`]: crate
pub type Result<T> = std::result::Result<T, Error>;
