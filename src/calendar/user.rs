use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record as handed over by the auth provider. Only the fields the
/// share-matching rules need are kept here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
        }
    }
}
