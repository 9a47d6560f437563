use storefront_db::Database;
use storefront_types::models::Comment;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

/// Newest first.
pub fn list_by_product(db: &Database, product_id: i64) -> ServiceResult<Vec<Comment>> {
    let rows = db.list_comments(product_id)?;
    Ok(rows.into_iter().map(|row| row.into_comment()).collect())
}

pub fn count_by_product(db: &Database, product_id: i64) -> ServiceResult<u64> {
    Ok(db.count_comments(product_id)?)
}

/// Stores the trimmed content and returns the comment as persisted.
/// A user may comment on the same product any number of times.
pub fn add(db: &Database, product_id: i64, user_id: i64, content: &str) -> ServiceResult<Comment> {
    let content = non_empty(content)?;
    if !db.product_exists(product_id)? {
        return Err(ServiceError::NotFound("product"));
    }

    let id = db.insert_comment(product_id, user_id, content)?;
    info!("User {} commented on product {} (comment {})", user_id, product_id, id);
    reload(db, id)
}

/// Only the author may edit. A missing comment and someone else's comment
/// both come back as [`ServiceError::NotFoundOrForbidden`].
pub fn edit(db: &Database, comment_id: i64, user_id: i64, content: &str) -> ServiceResult<Comment> {
    let content = non_empty(content)?;
    if !db.update_comment_owned(comment_id, user_id, content)? {
        return Err(ServiceError::NotFoundOrForbidden);
    }
    reload(db, comment_id)
}

/// False means "no such comment owned by this user".
pub fn delete(db: &Database, comment_id: i64, user_id: i64) -> ServiceResult<bool> {
    let deleted = db.delete_comment_owned(comment_id, user_id)?;
    if deleted {
        info!("User {} deleted comment {}", user_id, comment_id);
    }
    Ok(deleted)
}

fn non_empty(content: &str) -> ServiceResult<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::EmptyContent);
    }
    Ok(content)
}

fn reload(db: &Database, comment_id: i64) -> ServiceResult<Comment> {
    // Deleted between the write and this read.
    let row = db
        .get_comment(comment_id)?
        .ok_or(ServiceError::NotFoundOrForbidden)?;
    Ok(row.into_comment())
}
