//! Codecs for Subsonic fields that are not plain JSON scalars.
//!
//! Each codec is a pair of pure functions plus serde adapters for use with
//! `#[serde(with = "...")]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ISO-8601 timestamps such as `2024-03-01T12:00:00.000Z`.
pub mod instant {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Sub-second digits are written only when present, so decoding the
    /// output yields the same instant.
    pub fn encode(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn decode(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value).map(|parsed| parsed.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        decode(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::{decode, encode};
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_some(&encode(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| decode(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// URI-valued string fields.
pub mod uri {
    use serde::{Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn encode(value: &Url) -> String {
        value.as_str().to_string()
    }

    pub fn decode(value: &str) -> Result<Url, url::ParseError> {
        Url::parse(value)
    }

    pub fn serialize<S: Serializer>(value: &Url, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Url, D::Error> {
        let raw = String::deserialize(deserializer)?;
        decode(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::decode;
        use serde::{Deserialize, Deserializer, Serializer};
        use url::Url;

        pub fn serialize<S: Serializer>(value: &Option<Url>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_some(value.as_str()),
                None => serializer.serialize_none(),
            }
        }

        /// Servers send `""` for "no image"; that reads as absent.
        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Url>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.is_empty() => decode(&raw).map(Some).map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown Subsonic error code {0}")]
pub struct UnknownErrorCode(pub i32);

/// Documented Subsonic error codes. Any other integer fails decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ErrorCode {
    Generic = 0,
    MissingParameter = 10,
    ClientTooOld = 20,
    ServerTooOld = 30,
    WrongCredentials = 40,
    TokenAuthNotSupported = 41,
    NotAuthorized = 50,
    TrialExpired = 60,
    NotFound = 70,
}

impl TryFrom<i32> for ErrorCode {
    type Error = UnknownErrorCode;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        let code = match code {
            0 => ErrorCode::Generic,
            10 => ErrorCode::MissingParameter,
            20 => ErrorCode::ClientTooOld,
            30 => ErrorCode::ServerTooOld,
            40 => ErrorCode::WrongCredentials,
            41 => ErrorCode::TokenAuthNotSupported,
            50 => ErrorCode::NotAuthorized,
            60 => ErrorCode::TrialExpired,
            70 => ErrorCode::NotFound,
            other => return Err(UnknownErrorCode(other)),
        };
        Ok(code)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code as i32
    }
}
