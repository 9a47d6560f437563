use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Row, params_from_iter};
use storefront_types::models::{NewProduct, ProductFilter, ProductUpdate};

use crate::Database;
use crate::models::ProductRow;
use crate::queries::OptionalExt;

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, category, image, created_at, updated_at";

/// Listing query assembled from a [`ProductFilter`].
///
/// Starts from an always-true predicate and narrows it once per present
/// filter, always in the order text, category, min price, max price, so the
/// same filter always yields the same SQL. `min_rating` is not part of it:
/// ratings are aggregated per row after the query runs.
#[derive(Debug)]
pub struct ListingQuery {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl ListingQuery {
    pub fn all() -> Self {
        Self {
            clauses: vec!["1 = 1".to_string()],
            params: Vec::new(),
        }
    }

    pub fn from_filter(filter: &ProductFilter) -> Self {
        let mut query = Self::all();
        if let Some(text) = &filter.text {
            query.and(Value::Text(format!("%{}%", escape_like(text))), |n| {
                format!("name LIKE ?{n} ESCAPE '\\'")
            });
        }
        if let Some(category) = &filter.category {
            query.and(Value::Text(category.clone()), |n| format!("category = ?{n}"));
        }
        if let Some(min) = filter.min_price {
            query.and(Value::Integer(min.cents()), |n| format!("price_cents >= ?{n}"));
        }
        if let Some(max) = filter.max_price {
            query.and(Value::Integer(max.cents()), |n| format!("price_cents <= ?{n}"));
        }
        query
    }

    /// `clause` receives the 1-based index of the parameter it binds.
    fn and(&mut self, value: Value, clause: impl FnOnce(usize) -> String) {
        self.params.push(value);
        self.clauses.push(clause(self.params.len()));
    }

    pub fn sql(&self) -> String {
        format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {} ORDER BY id",
            self.clauses.join(" AND ")
        )
    }
}

/// Makes `%`, `_` and the escape character itself match literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Database {
    pub fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductRow>> {
        let query = ListingQuery::from_filter(filter);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&query.sql())?;
            let rows = stmt
                .query_map(params_from_iter(query.params.iter()), product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_product(&self, id: i64) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
            let row = conn.query_row(&sql, [id], product_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn product_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM products WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Distinct categories in alphabetical order.
    pub fn list_categories(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT category FROM products ORDER BY category")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_product(&self, product: &NewProduct) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO products (name, description, price_cents, category, image)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &product.name,
                    &product.description,
                    product.price.cents(),
                    &product.category,
                    &product.image,
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Applies the present fields of `update`; a present-but-null description
    /// or image clears the column. Returns false if the product does not exist.
    pub fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE products SET
                    name        = COALESCE(?1, name),
                    description = CASE WHEN ?2 THEN ?3 ELSE description END,
                    price_cents = COALESCE(?4, price_cents),
                    category    = COALESCE(?5, category),
                    image       = CASE WHEN ?6 THEN ?7 ELSE image END,
                    updated_at  = datetime('now')
                 WHERE id = ?8",
                (
                    &update.name,
                    update.description.is_some(),
                    update.description.as_ref().and_then(|d| d.as_deref()),
                    update.price.map(|p| p.cents()),
                    &update.category,
                    update.image.is_some(),
                    update.image.as_ref().and_then(|i| i.as_deref()),
                    id,
                ),
            )?;
            Ok(changed > 0)
        })
    }

    /// Comments and ratings go with it (ON DELETE CASCADE).
    pub fn delete_product(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price_cents: row.get(3)?,
        category: row.get(4)?,
        image: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
