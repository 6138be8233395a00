use std::{
    collections::HashMap,
    convert::TryFrom,
    fmt::Display,
    str::FromStr,
};

use crate::errors::DiscoverError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupportedProvider {
    YandexCloud,
}

impl SupportedProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedProvider::YandexCloud => "yandex-cloud",
        }
    }
}

impl Display for SupportedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SupportedProvider {
    type Err = DiscoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase()[..] {
            "yandex-cloud" => Ok(SupportedProvider::YandexCloud),
            _ => Err(DiscoverError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// A utility type for parsing and working with the CLI arguments
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    inner: HashMap<String, String>,
    provider: SupportedProvider,
}

impl ParsedArgs {
    pub fn get(&self, key: &str) -> Option<&String> {
        self.inner.get(key)
    }

    pub fn provider(&self) -> &SupportedProvider {
        &self.provider
    }
}

impl TryFrom<Vec<String>> for ParsedArgs {
    type Error = DiscoverError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        let mut args = HashMap::with_capacity(value.len());
        for arg_str in value {
            let (key, val) = match arg_str.split_once('=') {
                Some((key, val)) if !key.is_empty() && !val.is_empty() => (key, val),
                Some((key, _)) => {
                    return Err(DiscoverError::MalformedArgument(
                        key.to_string(),
                        "Expected an argument on the format: key=value".to_string(),
                    ))
                }
                None => {
                    return Err(DiscoverError::MalformedArgument(
                        arg_str.clone(),
                        "Expected an argument on the format: key=value".to_string(),
                    ))
                }
            };

            // Fail on duplicate arg
            if args.insert(key.to_string(), val.to_string()).is_some() {
                return Err(DiscoverError::DuplicateArgument(key.to_string()));
            }
        }

        let provider = match args.get("provider") {
            // provider must always be provided
            None => return Err(DiscoverError::MissingArgument("provider".into())),
            Some(p) => p.parse::<SupportedProvider>()?,
        };

        Ok(Self {
            inner: args,
            provider,
        })
    }
}

impl TryFrom<String> for ParsedArgs {
    type Error = DiscoverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let args = value
            .split_whitespace()
            .map(String::from)
            .collect::<Vec<_>>();
        ParsedArgs::try_from(args)
    }
}
