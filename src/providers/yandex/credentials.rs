use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{errors::DiscoverError, logger::ProviderLog};

pub const DEFAULT_SERVICE_ACCOUNT_KEY_PATH: &str = "/etc/yandex_service_account_key.json";
pub const DEFAULT_OAUTH_TOKEN_PATH: &str = "/etc/yandex_oauth_token";

/// Lifetime of the JWT exchanged for an IAM token. The IAM API rejects
/// anything above one hour.
const JWT_LIFETIME_SECS: u64 = 3600;

#[derive(Error, Debug)]
pub enum KeyFileError {
    #[error("unable to read `{}`: {}", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed service account key in `{}`: {}", .path.display(), .source)]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid private key in `{}`: {}", .path.display(), .source)]
    PrivateKey {
        path: PathBuf,
        source: jsonwebtoken::errors::Error,
    },
}

/// On-disk layout of a key created with `yc iam key create`.
#[derive(Deserialize)]
struct KeyFile {
    id: String,
    service_account_id: String,
    private_key: String,
}

/// An authorized key of a service account, ready to sign JWTs.
#[derive(Clone)]
pub struct ServiceAccountKey {
    id: String,
    service_account_id: String,
    signing_key: EncodingKey,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("id", &self.id)
            .field("service_account_id", &self.service_account_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, KeyFileError> {
        let data = fs::read(path).map_err(|source| KeyFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: KeyFile =
            serde_json::from_slice(&data).map_err(|source| KeyFileError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        // Keys issued by the CLI carry a banner line before the PEM block.
        let pem = match file.private_key.find("-----BEGIN") {
            Some(start) => &file.private_key[start..],
            None => &file.private_key[..],
        };
        let signing_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|source| {
                KeyFileError::PrivateKey {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        Ok(Self {
            id: file.id,
            service_account_id: file.service_account_id,
            signing_key,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn service_account_id(&self) -> &str {
        &self.service_account_id
    }

    /// Signs a PS256 JWT addressed to `audience`, to be exchanged for an IAM token.
    pub fn jwt(&self, audience: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let mut header = Header::new(Algorithm::PS256);
        header.kid = Some(self.id.clone());

        let claims = Claims {
            iss: &self.service_account_id,
            aud: audience,
            iat,
            exp: iat + JWT_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&header, &claims, &self.signing_key)
    }
}

#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccountKey(ServiceAccountKey),
    OAuthToken(String),
}

/// Picks the credentials to authenticate with.
///
/// The service account key at `service_account_key` wins whenever it can be
/// loaded. Otherwise the OAuth token at `oauth_token` is used, with one
/// trailing newline removed. If neither is usable the error names both
/// failures.
pub(crate) fn resolve(
    service_account_key: &Path,
    oauth_token: &Path,
    log: &ProviderLog<'_>,
) -> Result<Credentials, DiscoverError> {
    let key_err = match ServiceAccountKey::from_file(service_account_key) {
        Ok(key) => {
            log.debug(format_args!(
                "Using service account key {} of service account {}",
                key.id(),
                key.service_account_id()
            ));
            return Ok(Credentials::ServiceAccountKey(key));
        }
        Err(e) => e,
    };
    log.debug(format_args!(
        "Service account key unavailable ({}), falling back to OAuth token {}",
        key_err,
        oauth_token.display()
    ));

    match fs::read_to_string(oauth_token) {
        Ok(token) => {
            let token = token.strip_suffix('\n').unwrap_or(&token);
            Ok(Credentials::OAuthToken(token.to_string()))
        }
        Err(e) => Err(DiscoverError::Credentials {
            service_account_key: key_err.to_string(),
            oauth_token: format!("unable to read `{}`: {}", oauth_token.display(), e),
        }),
    }
}
