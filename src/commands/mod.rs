// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use crate::config::Config;
use crate::efuse::VendorStorage;
use crate::printer::Nlp;
use crate::provision::{Options, Provisioner};
use crate::server::HttpServer;

use clap::Parser;

pub trait Command {
    fn execute(self) -> anyhow::Result<()>;
}

/// ODROID eFuse UUID/MAC provisioning
#[derive(Parser, Debug)]
#[clap(name = "efuse_control", args_override_self = true)]
pub struct Main {
    /// Board name sent to the mac server
    #[clap(short = 'B', long = "board_name", default_value = "m1s")]
    board: String,

    /// Request uuids from the developer server (default)
    #[clap(short = 'D', long, overrides_with = "factory")]
    developer: bool,

    /// Request uuids from the factory server
    #[clap(short = 'F', long, overrides_with = "developer")]
    factory: bool,

    /// Erase the efuse
    #[clap(short = 'e', long = "efuse_erase")]
    erase: bool,

    /// Write the efuse
    #[clap(short = 'w', long = "efuse_write")]
    write: bool,

    /// The uuid to write (if none, get one from the server)
    #[clap(short = 'u', long = "efuse_uuid")]
    uuid: Option<String>,

    /// Erase, then write the efuse
    #[clap(short = 'f', long = "efuse_force", alias = "force_write")]
    force: bool,

    /// Read and display the efuse
    #[clap(short = 'r', long = "efuse_read")]
    read: bool,

    /// Print the mac address label
    #[clap(short = 'p', long = "mac_print")]
    print: bool,

    /// Configuration file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// Stray operands are accepted and ignored
    #[clap(hide = true)]
    _operands: Vec<String>,
}

impl Main {
    /// Exit status after showing the usage text.
    pub const USAGE_EXIT: i32 = 1;

    pub const USAGE: &'static str = r###"
Usage: efuse_control [-F | -D] [-B:Board name] [-e | -w | -f | -r | -p]] [ -u:uuid(-w | -f )]

  -B --board_name     request board name.(default m1s)
  -D --developer      developer server ctrl (default)
  -F --factory        factory server ctrl
  -e --efuse_erase    efuse erase
  -w --efuse_write    efuse write
  -u --efuse_uuid     efuse uuid data (if none, get uuid from the server)
  -f --efuse_force    force efuse write (erase + write)
  -r --efuse_read     efuse data read & display
  -p --mac_print      print mac address
  -c --config         configuration file (default /etc/efuse_control.conf)

  e.g) efuse write (with uuid)
       efuse_control [-D:Developer | -F:Factory] -B [Board:m1s] -w -u [uuid]
  e.g) efuse write (with server uuid)
       efuse_control [-D:Developer | -F:Factory] -B [Board:m1s] -w
  e.g) efuse erase
       efuse_control [-D:Developer | -F:Factory] -B [Board:m1s] -e
"###;

    pub fn usage(out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "{}", Self::USAGE)?;
        out.flush()
    }

    /// Parses the process arguments, including the program name.
    ///
    /// Returns `None` when nothing was requested or the arguments could not
    /// be parsed; the caller is expected to show `USAGE`.
    pub fn from_args<I, T>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        if args.len() < 2 {
            return None;
        }

        match Self::try_parse_from(args) {
            Ok(main) => Some(main),
            Err(e) => {
                log::debug!("bad arguments: {}", e);
                None
            }
        }
    }

    pub fn options(&self) -> Options {
        Options {
            board: self.board.clone(),
            factory: self.factory && !self.developer,
            uuid: self.uuid.as_ref().map(|uuid| uuid.to_ascii_uppercase()),
            read: self.read,
            erase: self.erase || self.force,
            write: self.write || self.force,
            print: self.print,
        }
    }
}

impl Command for Main {
    fn execute(self) -> anyhow::Result<()> {
        let cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::scan(),
        };
        log::debug!("{:?}", cfg);

        let mut provisioner = Provisioner {
            efuse: VendorStorage::new(&cfg.device, cfg.slot),
            server: HttpServer::new(&cfg.factory, &cfg.developer),
            printer: Nlp::new(&cfg.printer),
        };

        let stdout = std::io::stdout();
        provisioner.run(&self.options(), &mut stdout.lock())?;
        Ok(())
    }
}
