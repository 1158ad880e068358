// SPDX-FileCopyrightText: 2022 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

// Basic example of watching for edge events on a single line.

use anyhow::Context;
use gpiowatch::cdev::{Cdev, CdevConfig};
use gpiowatch::{EdgeWatcher, Gpio};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut cfg = CdevConfig::default();
    cfg.on_chip("/dev/gpiochip0").with_consumer("watch-channel");
    let gpio = Gpio::new(Cdev::new(cfg)?);

    // bind the line with edge detection to receive events
    let mut watcher = EdgeWatcher::bind(&gpio, 23).context("Failed to bind line")?;
    watcher.on_edge(|event| println!("{event}"));

    // then wait for events...
    loop {
        gpio.wait(None)?;
    }
}
