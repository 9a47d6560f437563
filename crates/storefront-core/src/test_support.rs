use storefront_db::Database;
use storefront_types::Price;
use storefront_types::models::NewProduct;

pub fn db() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn user(db: &Database, email: &str) -> i64 {
    db.create_user(email, "Test User", "not-a-real-hash").unwrap()
}

pub fn product(db: &Database, name: &str, cents: i64, category: &str) -> i64 {
    db.insert_product(&NewProduct {
        name: name.into(),
        description: None,
        price: Price::from_cents(cents).unwrap(),
        category: category.into(),
        image: None,
    })
    .unwrap()
}
