// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::common::{self, emit_error, EmitOpts};
use anyhow::{Context, Result};
use clap::Parser;
use gpiowatch::cdev::{Cdev, CdevConfig};
use gpiowatch::{Backend, ChannelId, EdgeEvent, EdgeWatcher, Gpio};
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Parser)]
#[command(
    name = "watch-pin",
    about = "Watch a GPIO line for edge events.",
    version
)]
pub struct Opts {
    /// The line to watch
    ///
    /// The line is identified by offset on the --chip, or by name.
    #[arg(value_name = "channel", value_parser = parse_channel)]
    channel: ChannelId,

    /// The chip hosting the line, if identified by offset
    ///
    /// The chip may be identified by number, name, or path.
    /// e.g. the following all select the same chip:
    ///     --chip 0
    ///     --chip gpiochip0
    ///     --chip /dev/gpiochip0
    #[arg(
        short,
        long,
        value_name = "chip",
        default_value = "0",
        env = "WATCH_PIN_CHIP",
        verbatim_doc_comment
    )]
    chip: String,

    /// Display a banner on successful startup
    #[arg(long)]
    banner: bool,

    #[command(flatten)]
    active_low_opts: common::ActiveLowOpts,

    #[command(flatten)]
    bias_opts: common::BiasOpts,

    /// The debounce period for the watched line
    ///
    /// The period is taken as milliseconds unless otherwise specified.
    #[arg(short = 'p', long, value_name = "period", value_parser = common::parse_duration)]
    debounce_period: Option<Duration>,

    /// Exit if no events are received for the specified period.
    ///
    /// The period is taken as milliseconds unless otherwise specified.
    #[arg(long, value_name = "period", value_parser = common::parse_duration)]
    idle_timeout: Option<Duration>,

    /// Exit after the specified number of events
    ///
    /// If not specified then watching will continue indefinitely.
    #[arg(short, long, value_name = "num")]
    num_events: Option<u32>,

    /// The consumer label applied to the requested line.
    #[arg(short = 'C', long, value_name = "name", default_value = "watch-pin")]
    consumer: String,

    #[command(flatten)]
    pub emit: EmitOpts,
}

impl Opts {
    // build the backend config to match the options
    fn config(&self) -> Result<CdevConfig> {
        let mut cfg = CdevConfig::default();
        if let ChannelId::Offset(_) = self.channel {
            cfg.on_chip(common::chip_lookup_from_id(&self.chip)?);
        }
        cfg.with_consumer(self.consumer.as_str());
        if let Some(period) = self.debounce_period {
            cfg.with_debounce_period(period);
        }
        self.active_low_opts.apply(&mut cfg);
        self.bias_opts.apply(&mut cfg);
        Ok(cfg)
    }
}

fn parse_channel(s: &str) -> std::result::Result<ChannelId, gpiowatch::Error> {
    s.parse()
}

pub fn cmd(opts: &Opts) -> bool {
    match do_cmd(opts) {
        Err(e) => {
            emit_error(&opts.emit, &e);
            false
        }
        Ok(()) => true,
    }
}

fn do_cmd(opts: &Opts) -> Result<()> {
    let cdev = Cdev::new(opts.config()?).context("failed to create poll")?;
    let gpio = Gpio::new(cdev);
    watch(&gpio, opts, std::io::stdout())
}

/// Watch the channel, writing events to `out`, until the event limit or
/// idle timeout, if any, is reached.
pub(crate) fn watch<B, W>(gpio: &Gpio<B>, opts: &Opts, mut out: W) -> Result<()>
where
    B: Backend,
    W: Write + Send + 'static,
{
    let mut watcher = EdgeWatcher::bind(gpio, opts.channel.clone())
        .with_context(|| format!("failed to watch channel {}", opts.channel))?;

    let count = Arc::new(AtomicU32::new(0));
    let seen = count.clone();
    let limit = opts.num_events;
    let emit = opts.emit;
    watcher.on_edge(move |event| {
        if limit.is_some_and(|limit| seen.load(Ordering::Relaxed) >= limit) {
            return;
        }
        seen.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = emit_edge(&mut out, &event, &emit) {
            log::error!("failed to write event: {}", e);
        }
    });
    emit_banner(opts);

    // only events delivered to the handler restart the idle period
    let mut idle_deadline = opts.idle_timeout.map(|period| Instant::now() + period);
    loop {
        let timeout = idle_deadline.map(|d| d.saturating_duration_since(Instant::now()));
        let delivered = gpio
            .wait(timeout)
            .with_context(|| format!("failed to read events for channel {}", opts.channel))?;
        if let Some(limit) = opts.num_events {
            if count.load(Ordering::Relaxed) >= limit {
                break;
            }
        }
        match delivered {
            Some(n) if n > 0 => {
                idle_deadline = opts.idle_timeout.map(|period| Instant::now() + period);
            }
            _ => {
                let idle = idle_deadline
                    .is_some_and(|deadline| delivered.is_none() || Instant::now() >= deadline);
                if idle {
                    log::debug!("idle timeout on channel {}", opts.channel);
                    break;
                }
            }
        }
    }
    watcher.unbind().context("failed to release channel")
}

fn emit_banner(opts: &Opts) {
    if !opts.banner {
        return;
    }
    println!("Watching channel '{}'...", opts.channel);
    _ = std::io::stdout().flush();
}

#[cfg_attr(not(feature = "json"), allow(unused_variables))]
fn emit_edge<W: Write>(out: &mut W, event: &EdgeEvent, opts: &EmitOpts) -> std::io::Result<()> {
    #[cfg(feature = "json")]
    if opts.json {
        serde_json::to_writer(&mut *out, event)?;
        writeln!(out)?;
        return out.flush();
    }
    writeln!(out, "{}", event)?;
    out.flush()
}
