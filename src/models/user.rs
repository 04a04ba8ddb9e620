use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,            // Unique ID for the user
    pub name: String,          // Display name, stamped onto reviews as the author
    pub email: String,         // Login identity, unique
    #[serde(skip_serializing)]
    pub password_hash: String, // Iterated SHA-256 digest, never exposed in JSON
    #[serde(skip_serializing)]
    pub password_salt: String, // Per-user random salt
}
