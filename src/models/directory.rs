use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::HarnessError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Home,
    Work,
    Other,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Home => "home",
            ContactType::Work => "work",
            ContactType::Other => "other",
        }
    }
}

impl std::fmt::Display for ContactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContactType {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(ContactType::Home),
            "work" => Ok(ContactType::Work),
            "other" => Ok(ContactType::Other),
            _ => Err(HarnessError::InvalidContactType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub company_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ContactType,
    pub email: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ContactType,
    pub phone_number: String,
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_type_round_trips_through_text() {
        for kind in [ContactType::Home, ContactType::Work, ContactType::Other] {
            assert_eq!(kind.to_string().parse::<ContactType>().unwrap(), kind);
        }
    }

    #[test]
    fn rejects_unknown_contact_type() {
        let err = "mobile".parse::<ContactType>().unwrap_err();
        assert!(matches!(err, HarnessError::InvalidContactType(ref s) if s == "mobile"));
        assert!(err.is_configuration());
    }
}
