use crate::{
    model::{Id, user::DisplayName, user::UserMarker},
    util::timestamp_ms,
};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ProfileMarker;

/// A stored profile. At most one exists per user; timestamps are
/// server-assigned (milliseconds on the wire).
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Id<ProfileMarker>,
    pub user_id: Id<UserMarker>,
    pub display_name: DisplayName,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub avatar_url: String,
    #[serde(with = "timestamp_ms")]
    pub created_at: UtcDateTime,
    #[serde(with = "timestamp_ms")]
    pub updated_at: UtcDateTime,
}

/// The editable subset of a profile, as submitted by a client.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub display_name: DisplayName,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::utc_datetime;

    #[test]
    fn profile_wire_shape_is_camel_case() {
        let profile = Profile {
            id: 7_u64.into(),
            user_id: 3_u64.into(),
            display_name: DisplayName::new("Ada".to_owned()).unwrap(),
            bio: "hi".to_owned(),
            location: String::new(),
            website: String::new(),
            avatar_url: String::new(),
            created_at: utc_datetime!(2025-02-01 00:00),
            updated_at: utc_datetime!(2025-02-01 00:00),
        };

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["userId"], 3);
        assert_eq!(value["displayName"], "Ada");
        assert!(value["createdAt"].is_i64() || value["createdAt"].is_u64());
    }

    #[test]
    fn profile_fields_default_the_optional_strings() {
        let fields: ProfileFields =
            serde_json::from_str(r#"{"displayName":"Ada","bio":"hello"}"#).unwrap();
        assert_eq!(fields.display_name.get(), "Ada");
        assert_eq!(fields.bio, "hello");
        assert_eq!(fields.website, "");
    }
}
