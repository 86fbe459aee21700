use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const DISPLAY_NAME_MAX_LEN: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// The identity provider's view of an account. Rows are provisioned
/// externally; this application only reads them.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id<UserMarker>,
    pub display_name: DisplayName,
    pub email: String,
    pub avatar_url: String,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The display name is invalid: {0}")]
pub struct InvalidDisplayNameError(String);

impl DisplayName {
    pub fn new(name: String) -> Result<Self, InvalidDisplayNameError> {
        if name.trim().is_empty() || name.chars().count() > DISPLAY_NAME_MAX_LEN {
            return Err(InvalidDisplayNameError(name));
        }
        Ok(DisplayName(name))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for DisplayName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        DisplayName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"DisplayName"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_length_cap() {
        assert!(DisplayName::new("Ada Lovelace".to_owned()).is_ok());
        assert!(DisplayName::new("x".repeat(DISPLAY_NAME_MAX_LEN)).is_ok());
        assert!(DisplayName::new("x".repeat(DISPLAY_NAME_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn display_name_rejects_blank() {
        assert!(DisplayName::new(String::new()).is_err());
        assert!(DisplayName::new("   ".to_owned()).is_err());
        assert!(DisplayName::new("\t\n".to_owned()).is_err());
    }

    #[test]
    fn display_name_rejected_in_deserialization() {
        let long = format!("\"{}\"", "x".repeat(DISPLAY_NAME_MAX_LEN + 1));
        assert!(serde_json::from_str::<DisplayName>(&long).is_err());
        assert!(serde_json::from_str::<DisplayName>("\"  \"").is_err());
        assert!(serde_json::from_str::<DisplayName>("\"Ada\"").is_ok());
    }
}
