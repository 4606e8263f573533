use crate::{ConfigSnafu, EnvVarSnafu, Error};
use snafu::prelude::*;
use typed_builder::TypedBuilder;

pub const DEFAULT_URI_ENV: &str = "MONGODB_URI";

/// Where to connect. `uri` is either a connection string or `env` /
/// `env=NAME` to read it from the environment.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Config {
    #[builder(default = "env".into(), setter(into))]
    pub uri: String,
    #[builder(setter(into))]
    pub database: String,
}

impl Config {
    pub fn resolve_uri(&self) -> Result<String, Error> {
        let uri = self.uri.trim();

        if uri.to_lowercase().starts_with("env") {
            let split: Vec<_> = uri.split('=').collect();
            let env = if split.len() == 1 {
                DEFAULT_URI_ENV
            } else if split.len() == 2 {
                split[1].trim()
            } else {
                ""
            };
            ensure!(
                !env.is_empty(),
                ConfigSnafu {
                    message: format!("Could not read environment variable name from `{uri}`")
                }
            );
            return std::env::var(env).context(EnvVarSnafu {
                envvar: env.to_owned(),
            });
        }

        ensure!(
            !uri.is_empty(),
            ConfigSnafu {
                message: "A MongoDB connection string is required"
            }
        );
        Ok(uri.to_owned())
    }

    /// Host part of the connection string, without credentials or options,
    /// safe to print.
    pub fn display_host(&self) -> String {
        let uri = self.resolve_uri().unwrap_or_else(|_| self.uri.clone());
        let without_scheme = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(&uri);
        let authority = without_scheme
            .split(['?', '/'])
            .next()
            .unwrap_or_default();
        let host = authority
            .rsplit_once('@')
            .map(|(_, rest)| rest)
            .unwrap_or(authority);
        host.to_owned()
    }
}

#[derive(Debug, TypedBuilder, Clone)]
pub struct Options {
    #[builder(default = 1000)]
    pub batch_size: usize,
    #[builder(default = true)]
    pub clear_existing: bool,
    #[builder(default)]
    pub delimiter: Option<u8>,
    #[builder(default)]
    pub quote: Option<u8>,
    #[builder(default = "_export".into(), setter(into))]
    pub strip_from_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Options::builder().build()
    }
}
