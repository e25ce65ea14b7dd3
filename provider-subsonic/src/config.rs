//! Connection settings for one Subsonic server.

use core_library::arguments::{ArgumentValue, ProviderArgument, ProviderArguments};
use core_library::{LibraryError, Result};
use std::fmt;
use url::Url;

use crate::client::AuthMode;

pub const ARG_SERVER: &str = "server";
pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_LEGACY_AUTH: &str = "use_legacy_authentication";

fn parse_server(raw: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("not a valid URL: {}", e))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        "http" | "https" => Err("URL has no host".to_string()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

fn validate_server(value: &ArgumentValue) -> std::result::Result<(), String> {
    match value {
        ArgumentValue::Text(raw) => parse_server(raw).map(|_| ()),
        ArgumentValue::Bool(_) => Err("expected a URL".to_string()),
    }
}

/// Fields a Subsonic connection needs.
pub fn argument_schema() -> Vec<ProviderArgument> {
    vec![
        ProviderArgument::text(ARG_SERVER, "Server")
            .required()
            .validator(validate_server),
        ProviderArgument::text(ARG_USERNAME, "Username").required(),
        ProviderArgument::text(ARG_PASSWORD, "Password")
            .required()
            .hidden(),
        ProviderArgument::boolean(ARG_LEGACY_AUTH, "Use legacy authentication")
            .default_value(false),
    ]
}

#[derive(Clone, PartialEq, Eq)]
pub struct SubsonicConfig {
    pub server: Url,
    pub username: String,
    pub password: String,
    pub auth_mode: AuthMode,
}

impl SubsonicConfig {
    /// Read settings from arguments already checked against
    /// [`argument_schema`].
    pub fn from_arguments(arguments: &ProviderArguments) -> Result<Self> {
        let server = parse_server(arguments.require_text(ARG_SERVER)?)
            .map_err(|message| LibraryError::invalid_input(ARG_SERVER, message))?;
        let auth_mode = if arguments.flag(ARG_LEGACY_AUTH).unwrap_or(false) {
            AuthMode::Legacy
        } else {
            AuthMode::Token
        };

        Ok(Self {
            server,
            username: arguments.require_text(ARG_USERNAME)?.to_string(),
            password: arguments.require_text(ARG_PASSWORD)?.to_string(),
            auth_mode,
        })
    }
}

impl fmt::Debug for SubsonicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsonicConfig")
            .field("server", &self.server.as_str())
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("auth_mode", &self.auth_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::arguments::validate_arguments;

    fn arguments(server: &str) -> ProviderArguments {
        ProviderArguments::new()
            .with(ARG_SERVER, server)
            .with(ARG_USERNAME, "alice")
            .with(ARG_PASSWORD, "sesame")
    }

    #[test]
    fn test_schema_defaults_to_token_auth() {
        let validated =
            validate_arguments(&argument_schema(), &arguments("https://music.example.com")).unwrap();
        let config = SubsonicConfig::from_arguments(&validated).unwrap();
        assert_eq!(config.auth_mode, AuthMode::Token);
        assert_eq!(config.server.as_str(), "https://music.example.com/");

        let schema = argument_schema();
        let password = schema.iter().find(|a| a.key == ARG_PASSWORD).unwrap();
        assert!(password.hidden && password.required);
    }

    #[test]
    fn test_legacy_flag() {
        let values = arguments("http://nas.local:4040").with(ARG_LEGACY_AUTH, true);
        let validated = validate_arguments(&argument_schema(), &values).unwrap();
        let config = SubsonicConfig::from_arguments(&validated).unwrap();
        assert_eq!(config.auth_mode, AuthMode::Legacy);
    }

    #[test]
    fn test_server_must_be_http() {
        for bad in ["ftp://music.example.com", "music.example.com", "http://"] {
            assert!(
                validate_arguments(&argument_schema(), &arguments(bad)).is_err(),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_debug_hides_password() {
        let validated =
            validate_arguments(&argument_schema(), &arguments("https://music.example.com")).unwrap();
        let config = SubsonicConfig::from_arguments(&validated).unwrap();
        assert!(!format!("{:?}", config).contains("sesame"));
    }
}
