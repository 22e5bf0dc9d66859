use serde::{Deserialize, Deserializer, Serialize};

pub const FALLBACK_CLUB_NAME: &str = "Club";

/// Treats `None` and whitespace-only values the same way.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Club {
    /// name, then slug, then the literal "Club".
    pub fn display_name(&self) -> &str {
        non_blank(&self.name)
            .or_else(|| non_blank(&self.slug))
            .unwrap_or(FALLBACK_CLUB_NAME)
    }

    /// The address used as a directions target, if there is a usable one.
    pub fn destination(&self) -> Option<&str> {
        non_blank(&self.address)
    }
}

// The profiles table has stored `year` both as text and as an integer.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Text(s)) => Some(s),
        Some(Lenient::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Fields to change on a profile. Unset fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.major.is_none() && self.year.is_none() && self.email.is_none()
    }
}

/// An authenticated session. The user id can only exist alongside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    AccountCreated,
    LoggedOut,
    AccountDeleted,
}
