use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,                // Unique ID for the review
    pub author: String,            // Display name of the reviewer
    pub rating: i64,               // Star rating, not validated server-side
    pub review_text: String,       // Body of the review
    pub created_on: DateTime<Utc>, // When the review was first stored
}
