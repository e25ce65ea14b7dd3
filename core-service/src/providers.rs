//! Construction of remote sources from stored arguments.

use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use core_library::arguments::{ProviderArgument, ProviderArguments};
use core_library::provider::{ProviderKey, ProviderSource, ProviderType};
use core_library::{LibraryError, Result};
use provider_subsonic::{argument_schema, SubsonicConfig, SubsonicProvider};
use std::sync::Arc;
use tracing::debug;

/// A configured remote provider as seen by hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub key: ProviderKey,
    pub name: String,
    pub arguments: ProviderArguments,
}

/// Builds sources for remote provider kinds.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Configuration fields for `provider_type`.
    fn schema(&self, provider_type: ProviderType) -> Result<Vec<ProviderArgument>>;

    /// Build a source from validated arguments, checking reachability first
    /// when `verify` is set.
    async fn connect(
        &self,
        provider_type: ProviderType,
        arguments: &ProviderArguments,
        verify: bool,
    ) -> Result<Arc<dyn ProviderSource>>;
}

fn not_remote(provider_type: ProviderType) -> LibraryError {
    LibraryError::invalid_input(
        "provider_type",
        format!("'{}' is not a configurable remote provider", provider_type),
    )
}

/// Factory for the built-in Subsonic provider.
pub struct SubsonicFactory {
    http_client: Arc<dyn HttpClient>,
    client_name: String,
}

impl SubsonicFactory {
    pub fn new(http_client: Arc<dyn HttpClient>, client_name: impl Into<String>) -> Self {
        Self {
            http_client,
            client_name: client_name.into(),
        }
    }
}

#[async_trait]
impl ProviderFactory for SubsonicFactory {
    fn schema(&self, provider_type: ProviderType) -> Result<Vec<ProviderArgument>> {
        match provider_type {
            ProviderType::Subsonic => Ok(argument_schema()),
            ProviderType::Local => Err(not_remote(provider_type)),
        }
    }

    async fn connect(
        &self,
        provider_type: ProviderType,
        arguments: &ProviderArguments,
        verify: bool,
    ) -> Result<Arc<dyn ProviderSource>> {
        if provider_type != ProviderType::Subsonic {
            return Err(not_remote(provider_type));
        }

        let config = SubsonicConfig::from_arguments(arguments)?;
        let provider =
            SubsonicProvider::from_config(self.http_client.clone(), &config, &self.client_name);
        if verify {
            debug!(server = %config.server, "Verifying Subsonic server");
            provider.verify().await?;
        }
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use core_library::arguments::validate_arguments;
    use core_library::status::ErrorKind;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn arguments() -> ProviderArguments {
        let values = ProviderArguments::new()
            .with("server", "https://music.example.com")
            .with("username", "alice")
            .with("password", "sesame");
        validate_arguments(&argument_schema(), &values).unwrap()
    }

    #[tokio::test]
    async fn test_connect_without_verification_makes_no_request() {
        let mut http = MockHttpClient::new();
        http.expect_execute().never();
        let factory = SubsonicFactory::new(Arc::new(http), "test");

        let source = factory
            .connect(ProviderType::Subsonic, &arguments(), false)
            .await
            .unwrap();
        assert_eq!(source.provider_type(), ProviderType::Subsonic);
        assert!(source.owns(&url::Url::parse("https://music.example.com/album/1").unwrap()));
    }

    #[tokio::test]
    async fn test_verification_failure_is_reported() {
        let mut http = MockHttpClient::new();
        // The ping is a read, so a refused connection is retried.
        http.expect_execute()
            .times(3)
            .returning(|_| Err(BridgeError::Network("connection refused".into())));
        let factory = SubsonicFactory::new(Arc::new(http), "test");

        let err = factory
            .connect(ProviderType::Subsonic, &arguments(), true)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), Some(ErrorKind::Io));
    }

    #[test]
    fn test_local_is_not_configurable() {
        let factory = SubsonicFactory::new(Arc::new(MockHttpClient::new()), "test");
        assert!(factory.schema(ProviderType::Local).is_err());
        assert_eq!(factory.schema(ProviderType::Subsonic).unwrap().len(), 4);
    }
}
