// SPDX-FileCopyrightText: 2021 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A command line tool for watching a GPIO line for edge events.

use clap::Parser;
use std::process::ExitCode;

mod common;
mod watch;

fn main() -> ExitCode {
    match watch::Opts::try_parse() {
        Ok(opts) => {
            common::init_logger(opts.emit.verbose);
            return if watch::cmd(&opts) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
        Err(e) => {
            _ = e.print();
            // help and version are reported on stdout and are not failures
            if !e.use_stderr() {
                return ExitCode::SUCCESS;
            }
        }
    }
    ExitCode::FAILURE
}
