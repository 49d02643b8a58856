// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::path::Path;
use std::str::from_utf8;

use anyhow::{bail, Context, Result};

/// Runtime settings for the collaborators.
///
/// Loaded from a file of whitespace separated `key=value` pairs. Values may
/// be double quoted and lines starting with `#` are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub factory: String,
    pub developer: String,
    pub printer: String,
    pub device: String,
    pub slot: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            factory: "http://192.168.0.224:8080".into(),
            developer: "http://127.0.0.1:8080".into(),
            printer: "192.168.0.100:9100".into(),
            device: "/dev/vendor_storage".into(),
            slot: 1,
        }
    }
}

impl Config {
    const PATH: &'static str = "/etc/efuse_control.conf";

    pub fn parse(text: &str) -> Result<Self> {
        if !text.is_ascii() {
            bail!("configuration is not ascii");
        }

        let mut cfg = Self::default();
        for line in text.lines().filter(|l| !l.trim_start().starts_with('#')) {
            for (k, v) in Pairs(line.as_bytes()) {
                match k {
                    Some("server.factory") => cfg.factory = v.into(),
                    Some("server.developer") => cfg.developer = v.into(),
                    Some("printer.addr") => cfg.printer = v.into(),
                    Some("efuse.device") => cfg.device = v.into(),
                    Some("efuse.id") => {
                        cfg.slot = v.parse().with_context(|| format!("bad efuse.id: {}", v))?
                    }
                    _ => log::debug!("ignoring config entry {:?}={:?}", k, v),
                }
            }
        }

        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::parse(&text)
    }

    pub fn scan() -> Self {
        Self::load(Self::PATH).unwrap_or_else(|e| {
            log::debug!("using default config: {:#}", e);
            Self::default()
        })
    }
}

struct Pairs<'a>(&'a [u8]);

impl<'a> Iterator for Pairs<'a> {
    type Item = (Option<&'a str>, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.0.is_empty() && self.0[0].is_ascii_whitespace() {
            self.0 = &self.0[1..];
        }

        if self.0.is_empty() {
            return None;
        }

        let mut quoted = false;
        let mut equals = None;
        let mut end = 0;

        while end < self.0.len() && (!self.0[end].is_ascii_whitespace() || quoted) {
            match self.0[end] {
                b'"' => quoted = !quoted,
                b'=' if equals.is_none() => equals = Some(end),
                _ => (),
            }

            end += 1;
        }

        let (token, rest) = self.0.split_at(end);
        self.0 = rest;

        // Input is checked to be ascii, so every split lands on a char boundary.
        let text = |bytes: &'a [u8]| from_utf8(bytes).unwrap_or_default();

        match equals {
            None => Some((None, text(unquote(token)))),
            Some(at) => {
                let (key, value) = token.split_at(at);
                Some((Some(text(unquote(key))), text(unquote(&value[1..]))))
            }
        }
    }
}

fn unquote(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(b"\"").unwrap_or(bytes);
    bytes.strip_suffix(b"\"").unwrap_or(bytes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        assert_eq!(Pairs(b"  \t ").next(), None);
    }

    #[test]
    fn pairs() {
        let mut pairs = Pairs(b" \t foo=bar bat\tbaz=\"qux quz\" \"a=b c\"\t");
        assert_eq!(pairs.next(), Some((Some("foo"), "bar")));
        assert_eq!(pairs.next(), Some((None, "bat")));
        assert_eq!(pairs.next(), Some((Some("baz"), "qux quz")));
        assert_eq!(pairs.next(), Some((Some("a"), "b c")));
        assert_eq!(pairs.next(), None);
    }

    #[test]
    fn settings() {
        let text = "# mac server\n\
                    server.factory=http://10.0.0.1:8080 server.developer=\"http://dev:80\"\n\
                    printer.addr=10.0.0.9:9100\n\
                    efuse.device=/tmp/vs efuse.id=16 unknown=1\n";
        let cfg = Config::parse(text).unwrap();
        assert_eq!(cfg.factory, "http://10.0.0.1:8080");
        assert_eq!(cfg.developer, "http://dev:80");
        assert_eq!(cfg.printer, "10.0.0.9:9100");
        assert_eq!(cfg.device, "/tmp/vs");
        assert_eq!(cfg.slot, 16);
    }

    #[test]
    fn comments() {
        let cfg = Config::parse("  # printer.addr=nowhere:1\n").unwrap();
        assert_eq!(cfg.printer, Config::default().printer);
    }

    #[test]
    fn bad_slot() {
        assert!(Config::parse("efuse.id=slot").is_err());
        assert!(Config::parse("server.factory=\u{e9}").is_err());
    }

    #[test]
    fn missing_file() {
        assert!(Config::load("/nonexistent/efuse_control.conf").is_err());
    }
}
