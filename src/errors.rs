use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DiscoverError {
    #[error("Invalid argument: `{0}`. Error message: `{1}`")]
    MalformedArgument(String, String),
    #[error("Duplicate argument with key: `{0}`")]
    DuplicateArgument(String),
    #[error("Argument with key: `{0}` is required")]
    MissingArgument(String),
    #[error(
        "Unsupported provider `{0}`. Either the provider is not supported or it is not enabled."
    )]
    UnsupportedProvider(String),
    #[error("Unable to load credentials. Service account key: `{service_account_key}`. OAuth token: `{oauth_token}`")]
    Credentials {
        service_account_key: String,
        oauth_token: String,
    },
    #[error("Got error while connecting to Yandex.Cloud: `{0}`")]
    Connection(String),
    #[error("Got error while getting list of Instance Groups from Yandex.Cloud: `{0}`")]
    ListInstanceGroups(String),
    #[error("Got error while getting list of instances in group `{group_id}` from Yandex.Cloud: `{cause}`")]
    ListInstances { group_id: String, cause: String },
}
