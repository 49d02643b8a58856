// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::io::Write;
use std::net::TcpStream;

use anyhow::{anyhow, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Mac,
}

impl Message {
    fn caption(&self) -> &'static str {
        match self {
            Self::Mac => "MAC",
        }
    }

    /// Renders a single ZPL label: a caption followed by a Code 128 barcode.
    pub fn zpl(&self, payload: &str) -> String {
        format!(
            "^XA^CI28^CF0,28^FO20,16^FD{} {}^FS^FO20,52^BY2^BCN,56,N,N,N^FD{}^FS^XZ\r\n",
            self.caption(),
            payload,
            payload
        )
    }
}

/// A label printer.
pub trait Printer {
    fn init(&mut self) -> Result<()>;
    fn print(&mut self, message: Message, payload: &str) -> Result<()>;
}

/// A network label printer accepting raw ZPL jobs.
pub struct Nlp {
    addr: String,
    stream: Option<TcpStream>,
}

impl Nlp {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
        }
    }
}

impl Printer for Nlp {
    fn init(&mut self) -> Result<()> {
        log::debug!("connecting to printer at {}", self.addr);
        self.stream = Some(TcpStream::connect(&self.addr)?);
        Ok(())
    }

    fn print(&mut self, message: Message, payload: &str) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("printer at {} is not initialized", self.addr))?;

        stream.write_all(message.zpl(payload).as_bytes())?;
        stream.flush()?;
        Ok(())
    }
}
