use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, Error};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::location::Location;
use crate::models::review::Review;
use crate::models::user::User;


// Define a struct to represent a database connection
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    // Create a new database connection
    pub fn new(db_path: &str) -> Result<Self, Error> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        info!("Database connection established at: {}", db_path);
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // Create the database schema
    pub async fn create_schema(&self) -> Result<(), Error> {
        let conn = self.conn.lock().await;

        // 1. Users table
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                password_salt TEXT NOT NULL
            );",
        )?;

        // 2. Locations table
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS locations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                rating INTEGER NOT NULL DEFAULT 0
            );",
        )?;

        // 3. Reviews table, owned by their location
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                location_id TEXT NOT NULL,
                author TEXT,
                rating INTEGER NOT NULL,
                review_text TEXT,
                created_on TEXT NOT NULL,
                review_order INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (location_id) REFERENCES locations(id) ON DELETE CASCADE
            );",
        )?;

        Ok(())
    }

    pub async fn create_user(&self, user: &User) -> Result<(), Error> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, password_salt)
             VALUES (?, ?, ?, ?, ?)",
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.password_salt
            ],
        )?;
        info!("User created: {}", user.email);
        Ok(())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            "SELECT id, name, email, password_hash, password_salt
             FROM users WHERE email = ?",
            [email],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    password_salt: row.get(4)?,
                })
            },
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_location(&self, location: &Location) -> Result<(), Error> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO locations (id, name, rating) VALUES (?, ?, ?)",
            params![location.id, location.name, location.rating],
        )?;
        info!("Location created: {}", location.name);
        Ok(())
    }

    pub async fn get_location(&self, location_id: &str) -> Result<Option<Location>, Error> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            "SELECT id, name, rating FROM locations WHERE id = ?",
            [location_id],
            |row| {
                Ok(Location {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    rating: row.get(2)?,
                })
            },
        );

        match result {
            Ok(location) => Ok(Some(location)),
            Err(Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, name, rating FROM locations ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Location {
                id: row.get(0)?,
                name: row.get(1)?,
                rating: row.get(2)?,
            })
        })?;

        let mut locations = Vec::new();
        for row in rows {
            locations.push(row?);
        }
        Ok(locations)
    }

    // Retrieve a location's reviews in insertion order
    pub async fn get_reviews(&self, location_id: &str) -> Result<Vec<Review>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, author, rating, review_text, created_on
             FROM reviews WHERE location_id = ?
             ORDER BY review_order ASC",
        )?;
        let rows = stmt.query_map([location_id], Self::review_from_row)?;

        let mut reviews = Vec::new();
        for row in rows {
            reviews.push(row?);
        }
        Ok(reviews)
    }

    pub async fn get_review(
        &self,
        location_id: &str,
        review_id: &str,
    ) -> Result<Option<Review>, Error> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            "SELECT id, author, rating, review_text, created_on
             FROM reviews WHERE id = ? AND location_id = ?",
            [review_id, location_id],
            Self::review_from_row,
        );

        match result {
            Ok(review) => Ok(Some(review)),
            Err(Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // Append a review to the end of the location's sequence
    pub async fn insert_review(
        &self,
        location_id: &str,
        review_id: &str,
        author: Option<&str>,
        rating: Option<i64>,
        review_text: Option<&str>,
        created_on: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let max_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(review_order), 0) FROM reviews WHERE location_id = ?",
            [location_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO reviews (id, location_id, author, rating, review_text, created_on, review_order)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                review_id,
                location_id,
                author,
                rating,
                review_text,
                created_on,
                max_order + 1
            ],
        )?;

        tx.commit()?;
        info!("Review {} added to location {}", review_id, location_id);
        Ok(())
    }

    // Replace the mutable fields of a review in place
    pub async fn update_review(
        &self,
        location_id: &str,
        review_id: &str,
        author: Option<&str>,
        rating: Option<i64>,
        review_text: Option<&str>,
    ) -> Result<usize, Error> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE reviews SET author = ?, rating = ?, review_text = ?
             WHERE id = ? AND location_id = ?",
            params![author, rating, review_text, review_id, location_id],
        )?;
        Ok(changed)
    }

    pub async fn delete_review(&self, location_id: &str, review_id: &str) -> Result<usize, Error> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute(
            "DELETE FROM reviews WHERE id = ? AND location_id = ?",
            [review_id, location_id],
        )?;
        if deleted > 0 {
            info!("Review deleted: {}", review_id);
        }
        Ok(deleted)
    }

    // Recompute the location's aggregate rating from its current reviews.
    // An empty sequence keeps the previously stored rating.
    pub async fn recompute_rating(&self, location_id: &str) -> Result<Option<i64>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT rating FROM reviews WHERE location_id = ?")?;
        let ratings = stmt
            .query_map([location_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        if ratings.is_empty() {
            return Ok(None);
        }

        let total: i64 = ratings.iter().sum();
        let rating = total / ratings.len() as i64; // integer truncation, not rounding

        conn.execute(
            "UPDATE locations SET rating = ? WHERE id = ?",
            params![rating, location_id],
        )?;
        info!("Average rating updated to {}", rating);
        Ok(Some(rating))
    }

    fn review_from_row(row: &rusqlite::Row<'_>) -> Result<Review, Error> {
        Ok(Review {
            id: row.get(0)?,
            author: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            rating: row.get(2)?,
            review_text: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            created_on: row.get(4)?,
        })
    }
}
