// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::io::{Result, Write};

use crate::efuse::{get_mac, valid_check, Efuse};
use crate::printer::{Message, Printer};
use crate::server::{Endpoint, MacServer, Request};

/// What a single invocation was asked to do.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub board: String,
    pub factory: bool,
    pub uuid: Option<String>,
    pub read: bool,
    pub erase: bool,
    pub write: bool,
    pub print: bool,
}

/// Runs the provisioning steps against a set of collaborators.
///
/// Steps run in a fixed order: read, erase, write, print. A collaborator
/// failure skips the confirmation line of that step and the sequence carries
/// on; the cause is only logged. Errors returned from here are failures to
/// write the report itself.
pub struct Provisioner<E, S, P> {
    pub efuse: E,
    pub server: S,
    pub printer: P,
}

fn attempt<T>(step: &str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("{} skipped: {:#}", step, e);
            None
        }
    }
}

impl<E: Efuse, S: MacServer, P: Printer> Provisioner<E, S, P> {
    pub fn run(&mut self, options: &Options, out: &mut impl Write) -> Result<()> {
        // The identity most recently seen on (or given to) the board.
        let mut last = None;

        if options.read {
            if let Some(uuid) = attempt("read", self.efuse.read()) {
                let mac = get_mac(&uuid).unwrap_or_default();
                writeln!(out, "EFUSE Read = {}, MAC = {}", uuid, mac)?;
                last = Some(uuid);
            }
        }

        if options.erase {
            last = None;
            if attempt("erase", self.efuse.erase()).is_some() {
                writeln!(out, "EFUSE Erase.")?;
            }
        }

        if options.write {
            self.write(options, &mut last, out)?;
        }

        if options.print {
            self.print(last, out)?;
        }

        Ok(())
    }

    fn write(
        &mut self,
        options: &Options,
        last: &mut Option<String>,
        out: &mut impl Write,
    ) -> Result<()> {
        let current = match attempt("write", self.efuse.read()) {
            Some(current) => current,
            None => return Ok(()),
        };

        if valid_check(&current) {
            writeln!(out, "EFUSE has already been written. {}.", current)?;
            *last = Some(current);
            return Ok(());
        }
        *last = Some(current);

        let (uuid, source) = match &options.uuid {
            Some(uuid) => (uuid.clone(), None),
            None => {
                let endpoint = if options.factory {
                    Endpoint::Factory
                } else {
                    Endpoint::Developer
                };

                let reply = self.server.request(endpoint, Request::Uuid, &options.board);
                let uuid = match attempt("write", reply) {
                    Some(uuid) => uuid.to_ascii_uppercase(),
                    None => return Ok(()),
                };

                // An explicit uuid is trusted as given; only allocations are checked.
                if !valid_check(&uuid) {
                    log::debug!("write skipped: invalid uuid {:?} from server", uuid);
                    return Ok(());
                }

                (uuid, Some(endpoint))
            }
        };

        if attempt("write", self.efuse.write(&uuid)).is_none() {
            return Ok(());
        }

        match source {
            None => writeln!(out, "EFUSE write {}.", uuid)?,
            Some(endpoint) => writeln!(out, "EFUSE write {}.(mac_server {})", uuid, endpoint)?,
        }

        *last = Some(uuid);
        Ok(())
    }

    fn print(&mut self, last: Option<String>, out: &mut impl Write) -> Result<()> {
        if attempt("print", self.printer.init()).is_none() {
            return Ok(());
        }

        let uuid = match last {
            Some(uuid) => Some(uuid),
            None => attempt("print", self.efuse.read()),
        };

        let mac = match uuid.as_deref().and_then(get_mac) {
            Some(mac) => mac,
            None => {
                log::debug!("print skipped: no valid uuid on the board");
                return Ok(());
            }
        };

        if attempt("print", self.printer.print(Message::Mac, &mac)).is_some() {
            writeln!(out, "mac address ({}) printed.", mac)?;
        }

        Ok(())
    }
}
