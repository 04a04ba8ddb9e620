use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Location {
    pub id: String,   // Unique ID for the location
    pub name: String, // Location name
    pub rating: i64,  // Aggregate rating derived from all of its reviews
}
