pub mod api;
pub mod credentials;

use std::{collections::HashMap, convert::TryFrom, path::PathBuf};

use log::Log;

use crate::{args::ParsedArgs, logger::ProviderLog, SupportedProvider};

use self::{
    api::{InstanceGroupApi, Session},
    credentials::{DEFAULT_OAUTH_TOKEN_PATH, DEFAULT_SERVICE_ACCOUNT_KEY_PATH},
};

use super::{DiscoverError, Provider};

/// Instances requested per group. Only this first page is ever read.
pub const INSTANCES_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct YandexProvider {
    folder_id: String,
    instance_group_name: String,
    service_account_key: PathBuf,
    oauth_token_file: PathBuf,
}

impl From<&HashMap<String, String>> for YandexProvider {
    fn from(config: &HashMap<String, String>) -> Self {
        YandexProvider::from_lookup(|key| config.get(key))
    }
}

impl TryFrom<ParsedArgs> for YandexProvider {
    type Error = DiscoverError;

    fn try_from(args: ParsedArgs) -> Result<Self, Self::Error> {
        Ok(YandexProvider::from_lookup(|key| args.get(key)))
    }
}

impl TryFrom<Vec<String>> for YandexProvider {
    type Error = DiscoverError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        let args = ParsedArgs::try_from(value)?;
        match *args.provider() {
            SupportedProvider::YandexCloud => YandexProvider::try_from(args),
        }
    }
}

impl YandexProvider {
    fn from_lookup<'a>(get: impl Fn(&str) -> Option<&'a String>) -> Self {
        let value = |key: &str| get(key).cloned().unwrap_or_default();
        let path = |key: &str, default: &str| {
            get(key)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        // `metadata_key`, `metadata_value` and `cidr` are documented in the
        // help text but not used for filtering.
        YandexProvider {
            folder_id: value("folder_id"),
            instance_group_name: value("instance_group_name"),
            service_account_key: path("service_account_key", DEFAULT_SERVICE_ACCOUNT_KEY_PATH),
            oauth_token_file: path("oauth_token_file", DEFAULT_OAUTH_TOKEN_PATH),
        }
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub fn instance_group_name(&self) -> &str {
        &self.instance_group_name
    }

    pub fn service_account_key(&self) -> &PathBuf {
        &self.service_account_key
    }

    pub fn oauth_token_file(&self) -> &PathBuf {
        &self.oauth_token_file
    }

    /// Collects the first-interface primary IPv4 address of every instance in
    /// every group named `instance_group_name` in `folder_id`.
    ///
    /// Any failed call aborts the whole lookup, addresses gathered so far
    /// included.
    async fn collect_addrs<A: InstanceGroupApi + ?Sized>(
        &self,
        api: &A,
        log: &ProviderLog<'_>,
    ) -> Result<Vec<String>, DiscoverError> {
        log.debug(format_args!(
            "Using folder_id={} instance_group_name={}",
            self.folder_id, self.instance_group_name
        ));

        let filter = format!("name = \"{}\"", self.instance_group_name);
        let groups = api.list_instance_groups(&self.folder_id, &filter).await?;
        log.debug(format_args!("Found {} instance groups", groups.len()));

        let mut addrs = Vec::new();
        for group in groups {
            let instances = api.list_instances(&group.id, INSTANCES_PAGE_SIZE).await?;
            log.debug(format_args!(
                "Instance group {} ({}) has {} instances",
                group.name,
                group.id,
                instances.len()
            ));

            for instance in instances {
                match instance.primary_v4_address() {
                    Some(addr) => {
                        log.info(format_args!(
                            "Found instance {} ({}) with primary IPv4: {}",
                            instance.name, instance.id, addr
                        ));
                        addrs.push(addr.to_string());
                    }
                    None => log.debug(format_args!(
                        "Instance {} ({}) has no primary IPv4 on its first network interface",
                        instance.name, instance.id
                    )),
                }
            }
        }

        log.debug(format_args!("Found ip addresses: {:?}", addrs));
        Ok(addrs)
    }
}

#[async_trait::async_trait]
impl Provider for YandexProvider {
    async fn addrs(&self, logger: Option<&dyn Log>) -> Result<Vec<String>, DiscoverError> {
        let log = ProviderLog::new(logger, module_path!());

        let credentials = credentials::resolve(
            &self.service_account_key,
            &self.oauth_token_file,
            &log,
        )?;
        let session = Session::connect(&credentials).await?;

        self.collect_addrs(&session, &log).await
    }

    fn help() -> &'static str {
        "Yandex Cloud:

	provider:            \"yandex-cloud\"
	folder_id:           The folder to look for instance groups in
	instance_group_name: The instance group name to filter on
	service_account_key: Path to a service account authorized key file.
	                     Defaults to \"/etc/yandex_service_account_key.json\".
	oauth_token_file:    Path to a file holding an OAuth token, used when the
	                     service account key can not be loaded.
	                     Defaults to \"/etc/yandex_oauth_token\".
	metadata_key:        metadata_key (not used for filtering)
	metadata_value:      metadata_value (not used for filtering)
	cidr:                cidr (not used for filtering)

	The address of an instance is the primary IPv4 address of its first network
	interface. At most 1000 instances are returned per group.
"
    }
}

/// Looks up instance group members for a plain configuration map.
///
/// Recognized keys are `folder_id`, `instance_group_name`,
/// `service_account_key` and `oauth_token_file`; every key is optional.
pub async fn addrs(
    config: &HashMap<String, String>,
    logger: Option<&dyn Log>,
) -> Result<Vec<String>, DiscoverError> {
    YandexProvider::from(config).addrs(logger).await
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use log::Level;
    use tempfile::TempDir;

    use super::api::{InstanceGroup, ManagedInstance};
    use super::*;
    use crate::logger::test::Capture;

    /// Serves canned responses and remembers what was asked.
    #[derive(Default)]
    struct FakeApi {
        groups: Vec<InstanceGroup>,
        instances: HashMap<String, Vec<ManagedInstance>>,
        failing_group: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn with_group(mut self, id: &str, instances: serde_json::Value) -> Self {
            self.groups.push(InstanceGroup {
                id: id.to_string(),
                name: "consul".to_string(),
            });
            self.instances
                .insert(id.to_string(), serde_json::from_value(instances).unwrap());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl InstanceGroupApi for FakeApi {
        async fn list_instance_groups(
            &self,
            folder_id: &str,
            filter: &str,
        ) -> Result<Vec<InstanceGroup>, DiscoverError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("groups {} {}", folder_id, filter));
            Ok(self.groups.clone())
        }

        async fn list_instances(
            &self,
            instance_group_id: &str,
            page_size: usize,
        ) -> Result<Vec<ManagedInstance>, DiscoverError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("instances {} {}", instance_group_id, page_size));
            if self.failing_group.as_deref() == Some(instance_group_id) {
                return Err(DiscoverError::ListInstances {
                    group_id: instance_group_id.to_string(),
                    cause: "503 Service Unavailable".to_string(),
                });
            }
            Ok(self
                .instances
                .get(instance_group_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn instance(addr: &str) -> serde_json::Value {
        serde_json::json!({
            "id": format!("id-{}", addr),
            "name": format!("name-{}", addr),
            "networkInterfaces": [{"index": "0", "primaryV4Address": {"address": addr}}]
        })
    }

    fn provider() -> YandexProvider {
        let config = vec![
            ("folder_id", "b1g0000"),
            ("instance_group_name", "consul"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>();
        YandexProvider::from(&config)
    }

    fn quiet_log() -> ProviderLog<'static> {
        ProviderLog::new(None, module_path!())
    }

    #[test]
    fn defaults_for_missing_keys() {
        let p = YandexProvider::from(&HashMap::new());
        assert_eq!(p.folder_id(), "");
        assert_eq!(p.instance_group_name(), "");
        assert_eq!(
            p.service_account_key(),
            &PathBuf::from(DEFAULT_SERVICE_ACCOUNT_KEY_PATH)
        );
        assert_eq!(p.oauth_token_file(), &PathBuf::from(DEFAULT_OAUTH_TOKEN_PATH));
    }

    #[test]
    fn parse_provider_from_args() {
        let args = "provider=yandex-cloud folder_id=b1g0000 instance_group_name=consul \
                    service_account_key=/tmp/key.json oauth_token_file=/tmp/token cidr=10.0.0.0/8"
            .split(' ')
            .map(String::from)
            .collect::<Vec<_>>();

        let p = YandexProvider::try_from(args).unwrap();
        assert_eq!(p.folder_id(), "b1g0000");
        assert_eq!(p.instance_group_name(), "consul");
        assert_eq!(p.service_account_key(), &PathBuf::from("/tmp/key.json"));
        assert_eq!(p.oauth_token_file(), &PathBuf::from("/tmp/token"));
    }

    #[tokio::test]
    async fn no_groups_yields_no_addrs() {
        let api = FakeApi::default();

        let addrs = provider().collect_addrs(&api, &quiet_log()).await.unwrap();

        assert!(addrs.is_empty());
        assert_eq!(api.calls(), vec!["groups b1g0000 name = \"consul\""]);
    }

    #[tokio::test]
    async fn concatenate_groups_in_order() {
        let api = FakeApi::default()
            .with_group("cl1aaa", serde_json::json!([instance("10.0.0.1")]))
            .with_group("cl1bbb", serde_json::json!([instance("10.0.0.2")]));

        let addrs = provider().collect_addrs(&api, &quiet_log()).await.unwrap();

        assert_eq!(addrs, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(
            api.calls(),
            vec![
                "groups b1g0000 name = \"consul\"",
                "instances cl1aaa 1000",
                "instances cl1bbb 1000",
            ]
        );
    }

    #[tokio::test]
    async fn skip_instances_without_first_interface() {
        let api = FakeApi::default().with_group(
            "cl1aaa",
            serde_json::json!([
                instance("10.0.0.1"),
                {"id": "null-slot", "networkInterfaces": [null]},
                {"id": "no-interfaces"},
                {"id": "no-address", "networkInterfaces": [{"index": "0"}]},
                instance("10.0.0.3"),
                instance("10.0.0.1"),
            ]),
        );

        let addrs = provider().collect_addrs(&api, &quiet_log()).await.unwrap();

        assert_eq!(addrs, vec!["10.0.0.1", "10.0.0.3", "10.0.0.1"]);
    }

    #[tokio::test]
    async fn failure_on_later_group_discards_earlier_addrs() {
        let mut api = FakeApi::default()
            .with_group("cl1aaa", serde_json::json!([instance("10.0.0.1")]))
            .with_group("cl1bbb", serde_json::json!([instance("10.0.0.2")]))
            .with_group("cl1ccc", serde_json::json!([instance("10.0.0.3")]));
        api.failing_group = Some("cl1bbb".to_string());

        let res = provider().collect_addrs(&api, &quiet_log()).await;

        assert_eq!(
            res,
            Err(DiscoverError::ListInstances {
                group_id: "cl1bbb".to_string(),
                cause: "503 Service Unavailable".to_string(),
            })
        );
        // The third group is never asked for.
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn log_found_addresses() {
        let api =
            FakeApi::default().with_group("cl1aaa", serde_json::json!([instance("10.0.0.1")]));
        let capture = Capture::default();
        let log = ProviderLog::new(Some(&capture), module_path!());

        provider().collect_addrs(&api, &log).await.unwrap();

        assert!(capture.messages().contains(&(
            Level::Info,
            "Found instance name-10.0.0.1 (id-10.0.0.1) with primary IPv4: 10.0.0.1".to_string()
        )));
    }

    #[tokio::test]
    async fn fail_without_credentials() {
        let dir = TempDir::new().unwrap();
        let mut config = HashMap::new();
        config.insert(
            "service_account_key".to_string(),
            dir.path().join("key.json").display().to_string(),
        );
        config.insert(
            "oauth_token_file".to_string(),
            dir.path().join("token").display().to_string(),
        );

        let res = addrs(&config, None).await;

        assert!(matches!(res, Err(DiscoverError::Credentials { .. })));
    }
}
