//! Database row types — these map directly to SQLite rows.
//! Distinct from storefront-types models to keep the DB layer independent;
//! the `into_*` conversions are the only place rows become domain values.

use chrono::{DateTime, Utc};
use storefront_types::Price;
use storefront_types::models::{AggregateRating, Comment, Product, PublicUser, Role};
use tracing::warn;

use crate::parse_timestamp;

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: i64,
    pub expires_at: String,
    pub created_at: String,
}

pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category: String,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CommentRow {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    /// Drops the password hash.
    pub fn into_public(self) -> PublicUser {
        let role = self.role.parse().unwrap_or_else(|e| {
            warn!("Corrupt role on user {}: {}", self.id, e);
            Role::User
        });
        PublicUser {
            created_at: timestamp_or_default(&self.created_at, "user", self.id),
            updated_at: timestamp_or_default(&self.updated_at, "user", self.id),
            id: self.id,
            email: self.email,
            name: self.name,
            role,
        }
    }
}

impl SessionRow {
    /// `None` when the stored value cannot be read; callers treat that as expired.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.expires_at)
    }
}

impl ProductRow {
    pub fn into_product(self, rating: AggregateRating) -> Product {
        let price = Price::from_cents(self.price_cents).unwrap_or_else(|| {
            warn!("Corrupt price {} on product {}", self.price_cents, self.id);
            Price::ZERO
        });
        Product {
            created_at: timestamp_or_default(&self.created_at, "product", self.id),
            updated_at: timestamp_or_default(&self.updated_at, "product", self.id),
            id: self.id,
            name: self.name,
            description: self.description,
            price,
            category: self.category,
            image: self.image,
            rating,
        }
    }
}

impl CommentRow {
    pub fn into_comment(self) -> Comment {
        Comment {
            created_at: timestamp_or_default(&self.created_at, "comment", self.id),
            updated_at: timestamp_or_default(&self.updated_at, "comment", self.id),
            id: self.id,
            product_id: self.product_id,
            user_id: self.user_id,
            content: self.content,
        }
    }
}

fn timestamp_or_default(raw: &str, entity: &str, id: i64) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}' on {} {}", raw, entity, id);
        DateTime::default()
    })
}
