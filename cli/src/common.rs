// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gpiocdev::chip::is_chip;
use gpiocdev::line::Bias;
use gpiowatch::cdev::CdevConfig;
use std::path::PathBuf;
use std::time::Duration;

// common helper functions

fn chip_path_from_id(id: &str) -> PathBuf {
    if id.chars().all(char::is_numeric) {
        // from number
        return format!("/dev/gpiochip{id}").into();
    }
    if !id.chars().any(|x| x == '/') {
        // from name
        let mut p: PathBuf = "/dev".into();
        p.push(id);
        return p;
    }
    // from raw path
    id.into()
}

pub fn chip_lookup_from_id(id: &str) -> Result<PathBuf> {
    is_chip(chip_path_from_id(id))
        .with_context(|| format!("cannot find GPIO chip character device '{id}'"))
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseDurationError {
    #[error("'{0}' unknown units - use 's', 'ms' or 'us'.")]
    Units(String),
    #[error("'{0}' must start with a digit")]
    NoDigits(String),
    #[error("'{0}' {1}")]
    ParseDigits(String, std::num::ParseIntError),
}

pub fn parse_duration(s: &str) -> std::result::Result<Duration, ParseDurationError> {
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    let t = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(0) => return Err(ParseDurationError::NoDigits(s.into())),
        Some(n) => {
            let (num, units) = s.split_at(n);
            let t = num
                .parse::<u64>()
                .map_err(|e| ParseDurationError::ParseDigits(num.into(), e))?;
            t * match units {
                "us" => 1000,
                "ms" => 1000000,
                "s" => 1000000000,
                _ => return Err(ParseDurationError::Units(s.into())),
            }
        }
        None => {
            s.parse::<u64>()
                .map_err(|e| ParseDurationError::ParseDigits(s.into(), e))?
                * 1000000
        }
    };
    Ok(Duration::from_nanos(t))
}

// common command line parser options

#[derive(Clone, Copy, Debug, Default, Parser)]
pub struct EmitOpts {
    /// Provide more detailed error messages and log output.
    #[arg(short = 'v', long, display_order = 800)]
    pub verbose: bool,

    /// Emit events in JSON format
    #[cfg(feature = "json")]
    #[arg(long)]
    pub json: bool,
}

pub fn emit_error(opts: &EmitOpts, e: &anyhow::Error) {
    let e_str = format_error(opts, e);
    #[cfg(feature = "json")]
    if opts.json {
        println!("{}", serde_json::json!({ "error": e_str }));
        return;
    }
    eprintln!("{e_str}");
}

pub fn format_error(opts: &EmitOpts, e: &anyhow::Error) -> String {
    if opts.verbose {
        format!("{e:#}")
    } else {
        format!("{e}")
    }
}

#[derive(Debug, Parser)]
pub struct ActiveLowOpts {
    /// Treat the line as active-low when determining value
    #[arg(short = 'l', long)]
    pub active_low: bool,
}
impl ActiveLowOpts {
    pub fn apply(&self, c: &mut CdevConfig) {
        if self.active_low {
            c.as_active_low();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum BiasFlags {
    PullUp,
    PullDown,
    Disabled,
}
impl From<BiasFlags> for Bias {
    fn from(b: BiasFlags) -> Self {
        match b {
            BiasFlags::PullUp => Bias::PullUp,
            BiasFlags::PullDown => Bias::PullDown,
            BiasFlags::Disabled => Bias::Disabled,
        }
    }
}

#[derive(Clone, Copy, Debug, Parser)]
pub struct BiasOpts {
    /// The bias to be applied to the line
    ///
    /// By default the bias is left unchanged.
    #[arg(short, long, value_name = "bias", value_enum, ignore_case = true)]
    pub bias: Option<BiasFlags>,
}
impl BiasOpts {
    pub fn apply(self, c: &mut CdevConfig) {
        if let Some(bias) = self.bias {
            c.with_bias(Bias::from(bias));
        }
    }
}

/// Initialise logging to stderr.
///
/// `RUST_LOG` overrides the default level.
pub fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
