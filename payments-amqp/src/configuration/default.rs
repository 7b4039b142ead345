use crate::configuration::{
    ConfigurationProvider, Settings, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_PORT,
    DEFAULT_USERNAME,
};

use config::{Config, ConfigError, Environment, File, Map, Value};
use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
};

/// Prefix of the environment variables read by default
pub const DEFAULT_ENVIRONMENT_PREFIX: &str = "PAYMENTS";

/// Separator between the prefix and nested keys in environment variables,
/// e.g `PAYMENTS__SPRING__RABBITMQ__HOST` for `spring.rabbitmq.host`
const ENVIRONMENT_SEPARATOR: &str = "__";

/// A [`ConfigurationProvider`] backed by the [`config`] crate.
///
/// Sources are layered, later ones taking precedence:
/// defaults, an optional file, environment variables, explicit overrides.
///
/// Environment variables must start with the prefix (`PAYMENTS` unless changed) followed by
/// `__`. Nested keys are separated by `__` and single underscores stand for the dashes of
/// kebab-case keys: `PAYMENTS__PAYMENT__REQUEST_PAYMENT_QUEUE` sets
/// `payment.request-payment-queue`.
pub struct DefaultConfigurationProvider<T> {
    file: Option<PathBuf>,
    defaults: Vec<(String, Value)>,
    overrides: Vec<(String, Value)>,
    environment: bool,
    environment_prefix: String,

    /// Variables read instead of the process environment
    environment_variables: Option<Vec<(String, String)>>,
    _phantom: PhantomData<T>,
}

impl<T> Default for DefaultConfigurationProvider<T> {
    fn default() -> Self {
        Self {
            file: None,
            defaults: Vec::new(),
            overrides: Vec::new(),
            environment: true,
            environment_prefix: DEFAULT_ENVIRONMENT_PREFIX.to_string(),
            environment_variables: None,
            _phantom: PhantomData,
        }
    }
}

impl DefaultConfigurationProvider<Settings> {
    /// A provider for [`Settings`] with the broker defaults pre-loaded
    pub fn new() -> Self {
        Self::default()
            .with_default("spring.rabbitmq.host", DEFAULT_HOST)
            .with_default("spring.rabbitmq.port", i64::from(DEFAULT_PORT))
            .with_default("spring.rabbitmq.username", DEFAULT_USERNAME)
            .with_default("spring.rabbitmq.password", DEFAULT_PASSWORD)
    }
}

impl<T> DefaultConfigurationProvider<T> {
    /// Read configuration from `file`. The format is deduced from the file extension
    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = Some(file.as_ref().into());
        self
    }

    /// Value used for `key` when no source defines it
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.push((key.into(), value.into()));
        self
    }

    /// Value used for `key` whatever the other sources define
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Toggle reading environment variables
    pub fn with_environment(mut self, value: bool) -> Self {
        self.environment = value;
        self
    }

    /// Only read environment variables starting with `prefix__`
    pub fn with_environment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.environment_prefix = prefix.into();
        self
    }

    /// Read `variables` instead of the environment of the process
    pub fn with_environment_variables<K, V>(
        mut self,
        variables: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.environment_variables = Some(
            variables
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Prefixed environment variables, with the underscores of each key segment turned into
    /// dashes
    fn environment_variables(&self) -> Map<String, String> {
        let prefix = format!("{}{ENVIRONMENT_SEPARATOR}", self.environment_prefix);
        let variables = match self.environment_variables {
            Some(ref variables) => variables.clone(),
            None => std::env::vars().collect(),
        };

        variables
            .into_iter()
            .filter_map(|(key, value)| {
                let path = key
                    .get(..prefix.len())
                    .filter(|head| head.eq_ignore_ascii_case(&prefix))
                    .and_then(|_| key.get(prefix.len()..))?;

                let path = path
                    .split(ENVIRONMENT_SEPARATOR)
                    .map(|segment| segment.replace('_', "-"))
                    .collect::<Vec<_>>()
                    .join(ENVIRONMENT_SEPARATOR);

                Some((format!("{prefix}{path}"), value))
            })
            .collect()
    }

    fn environment_source(&self) -> Environment {
        Environment::with_prefix(&self.environment_prefix)
            .prefix_separator(ENVIRONMENT_SEPARATOR)
            .separator(ENVIRONMENT_SEPARATOR)
            .try_parsing(true)
            .source(Some(self.environment_variables()))
    }
}

impl<T> ConfigurationProvider for DefaultConfigurationProvider<T>
where
    T: serde::de::DeserializeOwned,
{
    type Configuration = T;
    type Error = ConfigError;

    fn configure(&mut self) -> Result<Self::Configuration, Self::Error> {
        let mut builder = Config::builder();

        for (key, value) in &self.defaults {
            builder = builder.set_default(key.as_str(), value.clone())?;
        }

        if let Some(ref file) = self.file {
            builder = builder.add_source(File::from(file.as_path()));
        }

        if self.environment {
            builder = builder.add_source(self.environment_source());
        }

        for (key, value) in &self.overrides {
            builder = builder.set_override(key.as_str(), value.clone())?;
        }

        builder.build()?.try_deserialize()
    }
}
