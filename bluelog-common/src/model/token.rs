//! Bearer tokens identifying the blog admin.
//!
//! A token reads `admin_id:core:salt` with `core` and `salt` base64 encoded.
//! Only the argon2 hash of `core` salted with `salt` is persisted.

use crate::{
    model::{Id, admin::AdminMarker},
    util::PositiveDuration,
};
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Display, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;

pub const ADMIN_TOKEN_CORE_LEN: usize = 24;
pub const ADMIN_TOKEN_SALT_LEN: usize = 18;
pub const ADMIN_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing admin token failed: {0}")]
pub struct AdminTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AdminTokenDecodeError {
    #[error("Expected three parts separated by ':'")]
    MissingPart,
    #[error("Invalid admin id: {0}")]
    InvalidAdminId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The {0} part has the wrong length")]
    InvalidLength(&'static str),
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AdminToken {
    pub admin_id: Id<AdminMarker>,
    core: [u8; ADMIN_TOKEN_CORE_LEN],
    salt: [u8; ADMIN_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AdminTokenHash(pub Box<[u8; ADMIN_TOKEN_HASH_LEN]>);

/// Stored record of an issued token.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AdminSession {
    pub admin: Id<AdminMarker>,
    pub token_hash: AdminTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl AdminSession {
    #[must_use]
    pub fn is_expired_at(&self, now: UtcDateTime) -> bool {
        self.expires_after
            .is_some_and(|expires_after| self.created_at + expires_after.get() < now)
    }
}

impl AdminToken {
    #[must_use]
    pub fn generate(admin_id: Id<AdminMarker>) -> Self {
        Self {
            admin_id,
            core: rand::random(),
            salt: rand::random(),
        }
    }

    pub fn hash(&self) -> Result<AdminTokenHash, AdminTokenHashError> {
        let mut hash = Box::new([0; ADMIN_TOKEN_HASH_LEN]);
        Argon2::default()
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(AdminTokenHashError)?;

        Ok(AdminTokenHash(hash))
    }
}

impl Display for AdminToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.admin_id,
            Base64Display::new(&self.core, &BASE64_STANDARD),
            Base64Display::new(&self.salt, &BASE64_STANDARD),
        )
    }
}

fn decode_part<const N: usize>(
    part: &str,
    name: &'static str,
) -> Result<[u8; N], AdminTokenDecodeError> {
    BASE64_STANDARD
        .decode(part)?
        .try_into()
        .map_err(|_| AdminTokenDecodeError::InvalidLength(name))
}

impl FromStr for AdminToken {
    type Err = AdminTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [admin_id, core, salt] = {
            let mut parts = s.splitn(3, ':');
            let mut next = || parts.next().ok_or(Self::Err::MissingPart);
            [next()?, next()?, next()?]
        };

        Ok(Self {
            admin_id: u64::from_str(admin_id)
                .map_err(Self::Err::InvalidAdminId)?
                .into(),
            core: decode_part(core, "core")?,
            salt: decode_part(salt, "salt")?,
        })
    }
}

impl Debug for AdminToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminToken")
            .field("admin_id", &self.admin_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AdminTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AdminTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The admin token hash had an invalid length")]
pub struct InvalidAdminTokenHashError;

impl TryFrom<Vec<u8>> for AdminTokenHash {
    type Error = InvalidAdminTokenHashError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let hash: [u8; ADMIN_TOKEN_HASH_LEN] =
            value.try_into().map_err(|_| InvalidAdminTokenHashError)?;
        Ok(Self(Box::new(hash)))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            Id,
            token::{AdminSession, AdminToken, AdminTokenDecodeError},
        },
        util::PositiveDuration,
    };
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn token_string_round_trip_keeps_hash() {
        let token = AdminToken::generate(Id::new(3));
        let parsed: AdminToken = token.to_string().parse().unwrap();

        assert_eq!(parsed, token);
        assert_eq!(parsed.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn malformed_tokens() {
        assert_eq!(
            "3:abc".parse::<AdminToken>(),
            Err(AdminTokenDecodeError::MissingPart)
        );
        assert!(matches!(
            "x:AAAA:AAAA".parse::<AdminToken>(),
            Err(AdminTokenDecodeError::InvalidAdminId(_))
        ));
        assert_eq!(
            "3:AAAA:AAAA".parse::<AdminToken>(),
            Err(AdminTokenDecodeError::InvalidLength("core"))
        );
    }

    #[test]
    fn session_expiry() {
        let token = AdminToken::generate(Id::new(1));
        let created_at = utc_datetime!(2025-03-01 08:00);
        let mut session = AdminSession {
            admin: token.admin_id,
            token_hash: token.hash().unwrap(),
            created_at,
            expires_after: None,
        };
        assert!(!session.is_expired_at(created_at + Duration::days(365)));

        session.expires_after = Some(PositiveDuration::new(Duration::hours(1)).unwrap());
        assert!(!session.is_expired_at(created_at + Duration::minutes(59)));
        assert!(session.is_expired_at(created_at + Duration::minutes(61)));
    }
}
