//! Retrieve IP addresses of Yandex Cloud instance group members.
//!
//! Query folder "b1g0000" for the members of instance group "consul"
//! ```rust no_run
//! use yc_discover::get_addresses;
//!
//! #[tokio::main]
//! async fn main() {
//!     let args = "provider=yandex-cloud folder_id=b1g0000 instance_group_name=consul"
//!         .split(' ')
//!         .map(String::from)
//!         .collect();
//!     let res = get_addresses(args).await;
//!     match res {
//!         Ok(addrs) => println!("{:?}", addrs),
//!         Err(e) => println!("Error: {:?}", e),
//!     };
//! }
//! ```
//!
//! The provider can also be driven with a plain configuration map and a
//! logger of the caller's choosing
//! ```rust no_run
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = HashMap::new();
//!     config.insert("folder_id".to_string(), "b1g0000".to_string());
//!     config.insert("instance_group_name".to_string(), "consul".to_string());
//!     config.insert(
//!         "service_account_key".to_string(),
//!         "/etc/consul.d/sa-key.json".to_string(),
//!     );
//!     let res = yc_discover::yandex::addrs(&config, None).await;
//!     println!("{:?}", res);
//! }
//! ```
mod args;
mod errors;
mod logger;
mod providers;

use std::convert::TryFrom;

pub use args::{ParsedArgs, SupportedProvider};
pub use errors::DiscoverError;
pub use logger::Discard;
pub use providers::*;
use providers::yandex::YandexProvider;

/// Parses `key=value` arguments and asks the selected provider for addresses.
///
/// Provider diagnostics go to the global [`log`] logger.
pub async fn get_addresses(args: Vec<String>) -> Result<Vec<String>, DiscoverError> {
    let args = ParsedArgs::try_from(args)?;
    match *args.provider() {
        SupportedProvider::YandexCloud => {
            let p = YandexProvider::try_from(args)?;
            p.addrs(Some(log::logger())).await
        }
    }
}
