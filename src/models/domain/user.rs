use serde::{Deserialize, Serialize};

pub const GUEST_ID: &str = "guest";

/// The active identity as supplied by the sign-in collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub is_guest: bool,
}

impl Identity {
    pub fn guest() -> Self {
        Identity {
            id: GUEST_ID.to_string(),
            name: "Guest".to_string(),
            is_guest: true,
        }
    }

    pub fn member(id: &str, name: &str) -> Self {
        Identity {
            id: id.to_string(),
            name: name.to_string(),
            is_guest: false,
        }
    }

    /// Same account regardless of display name.
    pub fn same_account(&self, other: &Identity) -> bool {
        self.id == other.id && self.is_guest == other.is_guest
    }
}
