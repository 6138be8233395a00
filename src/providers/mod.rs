pub mod yandex;

use std::convert::TryFrom;

use log::Log;

use crate::{args::ParsedArgs, errors::DiscoverError};

#[async_trait::async_trait]
pub trait Provider: TryFrom<ParsedArgs> + Send + Sync {
    /// Retrieve IP addresses of nodes in this provider.
    ///
    /// Diagnostics are written to `logger`. When it is `None` they are
    /// discarded.
    async fn addrs(&self, logger: Option<&dyn Log>) -> Result<Vec<String>, DiscoverError>;
    /// Returns text explaining how to use this provider.
    ///
    /// That means which attributes are available and what the value of those
    /// attributes can be. Any other information that the user of this
    /// provider needs to know should also be explained.
    fn help() -> &'static str;
}
