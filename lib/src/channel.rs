// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{Error, Result};
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies the line a watcher is bound to.
///
/// Lines may be identified by their offset on a chip, or by name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ChannelId {
    /// The offset of the line on the chip.
    Offset(u32),

    /// The name of the line.
    Name(String),
}

impl ChannelId {
    /// Check that the identifier can name a line.
    pub fn validate(&self) -> Result<()> {
        match self {
            ChannelId::Offset(_) => Ok(()),
            ChannelId::Name(n) if n.trim().is_empty() => Err(Error::InvalidChannel(n.clone())),
            ChannelId::Name(_) => Ok(()),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Offset(o) => write!(f, "{}", o),
            ChannelId::Name(n) => write!(f, "{}", n),
        }
    }
}

/// Parses an identifier as an offset if it is all digits, else as a name.
impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<u32>()
                .map(ChannelId::Offset)
                .map_err(|_| Error::InvalidChannel(s.into()));
        }
        let id = ChannelId::Name(s.into());
        id.validate()?;
        Ok(id)
    }
}

impl From<u32> for ChannelId {
    fn from(offset: u32) -> Self {
        ChannelId::Offset(offset)
    }
}

impl From<&str> for ChannelId {
    fn from(name: &str) -> Self {
        ChannelId::Name(name.into())
    }
}

impl From<String> for ChannelId {
    fn from(name: String) -> Self {
        ChannelId::Name(name)
    }
}
