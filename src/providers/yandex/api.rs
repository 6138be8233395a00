use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::credentials::Credentials;
use crate::errors::DiscoverError;

pub const IAM_TOKEN_ENDPOINT: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";
pub const INSTANCE_GROUP_ENDPOINT: &str =
    "https://instance-group.api.cloud.yandex.net/instance-group/v1";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListInstanceGroupsResponse {
    #[serde(default)]
    instance_groups: Vec<InstanceGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstance {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub network_interfaces: Vec<Option<NetworkInterface>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default)]
    pub primary_v4_address: Option<PrimaryAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryAddress {
    #[serde(default)]
    pub address: String,
}

impl ManagedInstance {
    /// Primary IPv4 address of the first network interface. Later interfaces
    /// are never looked at.
    pub fn primary_v4_address(&self) -> Option<&str> {
        self.network_interfaces
            .first()?
            .as_ref()?
            .primary_v4_address
            .as_ref()
            .map(|a| a.address.as_str())
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListInstancesResponse {
    #[serde(default)]
    instances: Vec<ManagedInstance>,
}

#[derive(Debug, Serialize)]
enum CreateIamTokenRequest<'a> {
    #[serde(rename = "jwt")]
    Jwt(&'a str),
    #[serde(rename = "yandexPassportOauthToken")]
    OAuthToken(&'a str),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIamTokenResponse {
    iam_token: String,
}

/// The part of the Instance Group API the provider consumes.
#[async_trait::async_trait]
pub trait InstanceGroupApi: Send + Sync {
    /// Lists instance groups in `folder_id` matching `filter`.
    async fn list_instance_groups(
        &self,
        folder_id: &str,
        filter: &str,
    ) -> Result<Vec<InstanceGroup>, DiscoverError>;

    /// Lists the first `page_size` instances of an instance group.
    async fn list_instances(
        &self,
        instance_group_id: &str,
        page_size: usize,
    ) -> Result<Vec<ManagedInstance>, DiscoverError>;
}

/// An authenticated connection to Yandex.Cloud.
#[derive(Clone)]
pub struct Session {
    client: reqwest::Client,
    iam_token: String,
    endpoint: String,
}

impl Session {
    /// Exchanges `credentials` for an IAM token.
    pub async fn connect(credentials: &Credentials) -> Result<Self, DiscoverError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DiscoverError::Connection(format!("{:?}", e)))?;
        Self::connect_with(client, credentials, IAM_TOKEN_ENDPOINT, INSTANCE_GROUP_ENDPOINT).await
    }

    /// Like [`Session::connect`], against explicit endpoints and over `client`.
    pub async fn connect_with(
        client: reqwest::Client,
        credentials: &Credentials,
        iam_endpoint: &str,
        endpoint: &str,
    ) -> Result<Self, DiscoverError> {
        let jwt;
        let body = match credentials {
            Credentials::ServiceAccountKey(key) => {
                jwt = key
                    .jwt(iam_endpoint)
                    .map_err(|e| DiscoverError::Connection(format!("{:?}", e)))?;
                CreateIamTokenRequest::Jwt(&jwt)
            }
            Credentials::OAuthToken(token) => CreateIamTokenRequest::OAuthToken(token),
        };

        let res = client
            .post(iam_endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| DiscoverError::Connection(format!("{:?}", e)))?;
        let token = read_json::<CreateIamTokenResponse>(res)
            .await
            .map_err(DiscoverError::Connection)?;

        Ok(Session {
            client,
            iam_token: token.iam_token,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, String> {
        let res = self
            .client
            .get(format!("{}{}", self.endpoint, path))
            .bearer_auth(&self.iam_token)
            .query(query)
            .send()
            .await
            .map_err(|e| format!("{:?}", e))?;
        read_json(res).await
    }
}

#[async_trait::async_trait]
impl InstanceGroupApi for Session {
    async fn list_instance_groups(
        &self,
        folder_id: &str,
        filter: &str,
    ) -> Result<Vec<InstanceGroup>, DiscoverError> {
        let res: ListInstanceGroupsResponse = self
            .get(
                "/instanceGroups",
                &[("folderId", folder_id), ("filter", filter)],
            )
            .await
            .map_err(DiscoverError::ListInstanceGroups)?;
        Ok(res.instance_groups)
    }

    async fn list_instances(
        &self,
        instance_group_id: &str,
        page_size: usize,
    ) -> Result<Vec<ManagedInstance>, DiscoverError> {
        let page_size = page_size.to_string();
        let res: ListInstancesResponse = self
            .get(
                &format!("/instanceGroups/{}:listInstances", instance_group_id),
                &[("pageSize", page_size.as_str())],
            )
            .await
            .map_err(|cause| DiscoverError::ListInstances {
                group_id: instance_group_id.to_string(),
                cause,
            })?;
        Ok(res.instances)
    }
}

/// Decodes a successful response, or renders the status and body of a failed one.
async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, String> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(format!("{}: {}", status, body.trim()));
    }
    res.json::<T>().await.map_err(|e| format!("{:?}", e))
}
