// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::fmt;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Factory,
    Developer,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory => f.write_str("FACTORY"),
            Self::Developer => f.write_str("DEVELOPER"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Request {
    Uuid,
}

/// A source of freshly allocated board identities.
pub trait MacServer {
    fn request(&mut self, endpoint: Endpoint, request: Request, board: &str) -> Result<String>;
}

#[derive(Serialize, Debug)]
struct Query<'a> {
    #[serde(rename = "type")]
    kind: Request,
    board: &'a str,
}

#[derive(Deserialize, Debug)]
struct Reply {
    uuid: Option<String>,
    error: Option<String>,
}

impl Reply {
    fn into_uuid(self) -> Result<String> {
        if let Some(error) = self.error {
            bail!("mac server refused: {}", error);
        }

        match self.uuid {
            Some(uuid) if !uuid.trim().is_empty() => Ok(uuid.trim().to_string()),
            _ => Err(anyhow!("mac server returned no uuid")),
        }
    }
}

/// The allocation server reached over HTTP.
pub struct HttpServer {
    factory: String,
    developer: String,
}

impl HttpServer {
    pub fn new(factory: impl Into<String>, developer: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            developer: developer.into(),
        }
    }

    fn url(&self, endpoint: Endpoint) -> String {
        let base = match endpoint {
            Endpoint::Factory => &self.factory,
            Endpoint::Developer => &self.developer,
        };

        format!("{}/request", base.trim_end_matches('/'))
    }
}

impl MacServer for HttpServer {
    fn request(&mut self, endpoint: Endpoint, request: Request, board: &str) -> Result<String> {
        let url = self.url(endpoint);
        log::debug!("requesting {:?} for {} from {}", request, board, url);

        let body = serde_json::to_value(Query {
            kind: request,
            board,
        })?;

        let reply: Reply = ureq::post(&url).send_json(body)?.into_json()?;
        reply.into_uuid()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn query() {
        let query = Query {
            kind: Request::Uuid,
            board: "m1s",
        };

        assert_eq!(
            serde_json::to_string(&query).unwrap(),
            r#"{"type":"uuid","board":"m1s"}"#
        );
    }

    #[test]
    fn reply() {
        let reply: Reply =
            serde_json::from_str(r#"{"uuid":" 3aaef75c-a164-433b-8d34-001e06530012\n"}"#).unwrap();
        assert_eq!(
            reply.into_uuid().unwrap(),
            "3aaef75c-a164-433b-8d34-001e06530012"
        );

        let reply: Reply = serde_json::from_str(r#"{"error":"pool exhausted"}"#).unwrap();
        assert!(reply.into_uuid().is_err());

        let reply: Reply = serde_json::from_str(r#"{"uuid":""}"#).unwrap();
        assert!(reply.into_uuid().is_err());

        let reply: Reply = serde_json::from_str("{}").unwrap();
        assert!(reply.into_uuid().is_err());
    }

    #[test]
    fn urls() {
        let server = HttpServer::new("http://factory:8080/", "http://dev");
        assert_eq!(server.url(Endpoint::Factory), "http://factory:8080/request");
        assert_eq!(server.url(Endpoint::Developer), "http://dev/request");
    }

    #[test]
    fn endpoint_names() {
        assert_eq!(Endpoint::Factory.to_string(), "FACTORY");
        assert_eq!(Endpoint::Developer.to_string(), "DEVELOPER");
    }
}
