//! Bearer-token verification. Tokens are issued by the external identity
//! service; this application only parses, hashes and checks them.

use crate::{
    model::{Id, user::UserMarker},
    util::PositiveDuration,
};
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;

pub const ACCESS_TOKEN_SECRET_LEN: usize = 24;
pub const ACCESS_TOKEN_SALT_LEN: usize = 18;
pub const ACCESS_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing access token failed: {0}")]
pub struct AccessTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AccessTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the secret part is incorrect")]
    InvalidSecretLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// `<user id>:<base64 secret>:<base64 salt>` as carried in the
/// `Authorization` header.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AccessToken {
    pub user_id: Id<UserMarker>,
    pub secret: [u8; ACCESS_TOKEN_SECRET_LEN],
    pub salt: [u8; ACCESS_TOKEN_SALT_LEN],
}

/// The argon2 hash of a token's secret; only hashes are ever stored.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AccessTokenHash(pub Box<[u8; ACCESS_TOKEN_HASH_LEN]>);

/// A stored session row a presented token is checked against.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Session {
    pub user: Id<UserMarker>,
    pub token_hash: AccessTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Session {
    #[must_use]
    pub fn is_expired_at(&self, now: UtcDateTime) -> bool {
        self.expires_after
            .is_some_and(|lifetime| self.created_at + lifetime.get() < now)
    }
}

impl AccessToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        let secret = rand::random();
        let salt = rand::random();

        Self {
            user_id,
            secret,
            salt,
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_secret = Base64Display::new(&self.secret, &BASE64_STANDARD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{user_id}:{encoded_secret}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<AccessTokenHash, AccessTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; ACCESS_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.secret, &self.salt, &mut *hash)
            .map_err(AccessTokenHashError)?;

        Ok(AccessTokenHash(hash))
    }
}

impl FromStr for AccessToken {
    type Err = AccessTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let secret_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = u64::from_str(user_id_part)
            .map_err(Self::Err::InvalidUserId)?
            .into();
        let secret = BASE64_STANDARD
            .decode(secret_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSecretLength)?;
        let salt = BASE64_STANDARD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            secret,
            salt,
        })
    }
}

// Token material must never end up in logs.
impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("user_id", &self.user_id)
            .field("secret", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AccessTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The access token hash had an invalid length")]
pub struct InvalidAccessTokenHashError;

impl TryFrom<Box<[u8]>> for AccessTokenHash {
    type Error = InvalidAccessTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(
            value.try_into().map_err(|_| InvalidAccessTokenHashError)?,
        ))
    }
}
