// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

#![warn(clippy::all)]

mod commands;
mod config;
mod efuse;
mod printer;
mod provision;
mod server;

use commands::{Command, Main};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_module("efuse_control", log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    match Main::from_args(std::env::args_os()) {
        Some(main) => main.execute(),
        None => {
            Main::usage(&mut std::io::stdout())?;
            std::process::exit(Main::USAGE_EXIT);
        }
    }
}
