//! Item repository
//!
//! Handles item CRUD, hierarchy listing and tag assignment:
//! - create/update/delete run in a transaction on the request connection
//! - lists attach tags with one batched query per 500 items (no N+1)
//! - deleting an item removes its `item_tags` rows in the same transaction

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sqlx::{Connection, FromRow, QueryBuilder, Sqlite, SqliteConnection};

use super::{DbError, Tag};
use crate::images::StoredImage;
use crate::models::ItemName;

/// Column order shared by every item query
const ITEM_FIELDS: [&str; 10] = [
    "item_id",
    "label_id",
    "parent_item_id",
    "name",
    "state_id",
    "comment",
    "image_lg_path",
    "image_sm_path",
    "creation_date",
    "last_update",
];

/// Max ids bound into one `IN (...)` list
const TAG_BATCH: usize = 500;

/// Item record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Item {
    pub item_id: i64,
    pub label_id: Option<i64>,
    pub parent_item_id: Option<i64>,
    pub name: String,
    pub state_id: Option<i64>,
    pub comment: Option<String>,
    pub image_lg_path: Option<String>,
    pub image_sm_path: Option<String>,
    #[serde(serialize_with = "rfc3339")]
    pub creation_date: DateTime<Utc>,
    #[serde(serialize_with = "rfc3339")]
    pub last_update: DateTime<Utc>,
}

/// Same timestamp rendering as the HTTP response structs (`to_rfc3339`).
fn rfc3339<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339())
}

impl Item {
    /// Stored image paths (original, thumbnail) that exist on this row
    pub fn image_paths(&self) -> Vec<&str> {
        [&self.image_lg_path, &self.image_sm_path]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect()
    }
}

/// Item together with its tags
#[derive(Debug, Clone)]
pub struct ItemWithTags {
    pub item: Item,
    pub tags: Vec<Tag>,
}

/// Child item with the number of its own direct children
#[derive(Debug, Clone)]
pub struct ChildItem {
    pub item: ItemWithTags,
    pub children_count: i64,
}

#[derive(FromRow)]
struct ChildRow {
    #[sqlx(flatten)]
    item: Item,
    children_count: i64,
}

/// Values for a new item
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: ItemName,
    pub comment: Option<String>,
    pub label_id: Option<i64>,
    pub parent_item_id: Option<i64>,
    pub state_id: Option<i64>,
    pub image: Option<StoredImage>,
}

/// Partial update: `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub name: Option<ItemName>,
    pub comment: Option<String>,
    pub label_id: Option<i64>,
    pub parent_item_id: Option<i64>,
    pub state_id: Option<i64>,
    pub image: Option<StoredImage>,
}

/// Which child-count query to run. Both return the same rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildCount {
    /// LEFT JOIN on the children + GROUP BY
    Join,
    /// Correlated COUNT(*) subquery per row
    Subquery,
}

/// Item repository
pub struct ItemRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ItemRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Every item, unfiltered and unpaginated.
    pub async fn list(&mut self) -> Result<Vec<ItemWithTags>, DbError> {
        let sql = format!(
            "SELECT {} FROM items i ORDER BY i.item_id",
            item_columns("i")
        );
        let items: Vec<Item> = sqlx::query_as(&sql).fetch_all(&mut *self.conn).await?;

        Ok(attach_tags(&mut *self.conn, items).await?)
    }

    /// Get a single item by id.
    pub async fn get(&mut self, item_id: i64) -> Result<ItemWithTags, DbError> {
        let item = fetch_item(&mut *self.conn, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", item_id))?;
        let tags = tags_for_item(&mut *self.conn, item_id).await?;

        Ok(ItemWithTags { item, tags })
    }

    /// Insert a new item. `creation_date` and `last_update` start equal.
    pub async fn create(&mut self, new: NewItem) -> Result<ItemWithTags, DbError> {
        let now = Utc::now();
        let (image_lg_path, image_sm_path) = match new.image {
            Some(image) => (Some(image.large), Some(image.small)),
            None => (None, None),
        };

        let mut tx = self.conn.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO items (label_id, parent_item_id, name, state_id, comment,
                               image_lg_path, image_sm_path, creation_date, last_update)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING {}
            "#,
            ITEM_FIELDS.join(", ")
        );
        let item: Item = sqlx::query_as(&sql)
            .bind(new.label_id)
            .bind(new.parent_item_id)
            .bind(new.name.as_str())
            .bind(new.state_id)
            .bind(new.comment)
            .bind(image_lg_path)
            .bind(image_sm_path)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(item_id = item.item_id, "Created item");

        Ok(ItemWithTags {
            item,
            tags: Vec::new(),
        })
    }

    /// Apply a partial update. Returns the updated item and the row as it was
    /// before, so callers can clean up replaced image files.
    pub async fn update(
        &mut self,
        item_id: i64,
        changes: ItemChanges,
    ) -> Result<(ItemWithTags, Item), DbError> {
        let mut tx = self.conn.begin().await?;

        let previous = fetch_item(&mut *tx, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", item_id))?;

        let (image_lg_path, image_sm_path) = match changes.image {
            Some(image) => (Some(image.large), Some(image.small)),
            None => (
                previous.image_lg_path.clone(),
                previous.image_sm_path.clone(),
            ),
        };
        let name = changes
            .name
            .map(ItemName::into_string)
            .unwrap_or_else(|| previous.name.clone());

        let sql = format!(
            r#"
            UPDATE items
            SET name = ?1, comment = ?2, label_id = ?3, parent_item_id = ?4, state_id = ?5,
                image_lg_path = ?6, image_sm_path = ?7, last_update = ?8
            WHERE item_id = ?9
            RETURNING {}
            "#,
            ITEM_FIELDS.join(", ")
        );
        let item: Item = sqlx::query_as(&sql)
            .bind(name)
            .bind(changes.comment.or_else(|| previous.comment.clone()))
            .bind(changes.label_id.or(previous.label_id))
            .bind(changes.parent_item_id.or(previous.parent_item_id))
            .bind(changes.state_id.or(previous.state_id))
            .bind(image_lg_path)
            .bind(image_sm_path)
            .bind(next_update(&previous))
            .bind(item_id)
            .fetch_one(&mut *tx)
            .await?;

        let tags = tags_for_item(&mut *tx, item_id).await?;
        tx.commit().await?;
        tracing::info!(item_id, "Updated item");

        Ok((ItemWithTags { item, tags }, previous))
    }

    /// Delete an item and its tag associations. Returns the deleted row.
    ///
    /// Children are re-rooted by the `ON DELETE SET NULL` foreign key.
    pub async fn delete(&mut self, item_id: i64) -> Result<Item, DbError> {
        let mut tx = self.conn.begin().await?;

        let item = fetch_item(&mut *tx, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", item_id))?;

        let unlinked = sqlx::query("DELETE FROM item_tags WHERE item_id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM items WHERE item_id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(item_id, unlinked_tags = unlinked, "Deleted item");

        Ok(item)
    }

    /// Direct children of `parent` (`None` = root level), each with its own
    /// child count.
    ///
    /// An empty candidate set is `NotFound`, so a leaf parent and a missing
    /// parent answer the same way.
    pub async fn children(
        &mut self,
        parent: Option<i64>,
        strategy: ChildCount,
    ) -> Result<Vec<ChildItem>, DbError> {
        let sql = match strategy {
            ChildCount::Join => format!(
                r#"
                SELECT {}, COUNT(g.item_id) AS children_count
                FROM items c
                LEFT JOIN items g ON g.parent_item_id = c.item_id
                WHERE c.parent_item_id IS ?1
                GROUP BY c.item_id
                ORDER BY c.item_id
                "#,
                item_columns("c")
            ),
            ChildCount::Subquery => format!(
                r#"
                SELECT {},
                       (SELECT COUNT(*) FROM items g WHERE g.parent_item_id = c.item_id) AS children_count
                FROM items c
                WHERE c.parent_item_id IS ?1
                ORDER BY c.item_id
                "#,
                item_columns("c")
            ),
        };

        let rows: Vec<ChildRow> = sqlx::query_as(&sql)
            .bind(parent)
            .fetch_all(&mut *self.conn)
            .await?;

        if rows.is_empty() {
            let id = parent.map_or_else(|| "root".to_string(), |id| id.to_string());
            return Err(DbError::not_found("Item", id));
        }

        let (items, counts): (Vec<Item>, Vec<i64>) = rows
            .into_iter()
            .map(|r| (r.item, r.children_count))
            .unzip();
        let items = attach_tags(&mut *self.conn, items).await?;

        Ok(items
            .into_iter()
            .zip(counts)
            .map(|(item, children_count)| ChildItem {
                item,
                children_count,
            })
            .collect())
    }

    /// Items carrying the given label. `NotFound` if the label doesn't exist.
    pub async fn by_label(&mut self, label_id: i64) -> Result<Vec<ItemWithTags>, DbError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM labels WHERE label_id = ?1)")
                .bind(label_id)
                .fetch_one(&mut *self.conn)
                .await?;

        if !exists.0 {
            return Err(DbError::not_found("Label", label_id));
        }

        let sql = format!(
            "SELECT {} FROM items i WHERE i.label_id = ?1 ORDER BY i.item_id",
            item_columns("i")
        );
        let items: Vec<Item> = sqlx::query_as(&sql)
            .bind(label_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(attach_tags(&mut *self.conn, items).await?)
    }

    /// Items tagged with any tag named `tag_name`. `NotFound` if no tag has
    /// that name.
    pub async fn by_tag_name(&mut self, tag_name: &str) -> Result<Vec<ItemWithTags>, DbError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM tags WHERE tag_name = ?1)")
                .bind(tag_name)
                .fetch_one(&mut *self.conn)
                .await?;

        if !exists.0 {
            return Err(DbError::not_found("Tag", tag_name));
        }

        let sql = format!(
            r#"
            SELECT DISTINCT {}
            FROM items i
            JOIN item_tags it ON it.item_id = i.item_id
            JOIN tags t ON t.tag_id = it.tag_id
            WHERE t.tag_name = ?1
            ORDER BY i.item_id
            "#,
            item_columns("i")
        );
        let items: Vec<Item> = sqlx::query_as(&sql)
            .bind(tag_name)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(attach_tags(&mut *self.conn, items).await?)
    }

    /// Associate a tag with an item (idempotent).
    pub async fn add_tag(&mut self, item_id: i64, tag_id: i64) -> Result<ItemWithTags, DbError> {
        let mut tx = self.conn.begin().await?;

        let previous = fetch_item(&mut *tx, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", item_id))?;
        ensure_tag(&mut *tx, tag_id).await?;

        sqlx::query("INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?1, ?2)")
            .bind(item_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        let item = touch(&mut *tx, &previous).await?;
        let tags = tags_for_item(&mut *tx, item_id).await?;
        tx.commit().await?;
        tracing::info!(item_id, tag_id, "Tagged item");

        Ok(ItemWithTags { item, tags })
    }

    /// Remove a tag from an item. Removing an absent association is a no-op.
    pub async fn remove_tag(
        &mut self,
        item_id: i64,
        tag_id: i64,
    ) -> Result<ItemWithTags, DbError> {
        let mut tx = self.conn.begin().await?;

        let previous = fetch_item(&mut *tx, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", item_id))?;
        ensure_tag(&mut *tx, tag_id).await?;

        sqlx::query("DELETE FROM item_tags WHERE item_id = ?1 AND tag_id = ?2")
            .bind(item_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        let item = touch(&mut *tx, &previous).await?;
        let tags = tags_for_item(&mut *tx, item_id).await?;
        tx.commit().await?;
        tracing::info!(item_id, tag_id, "Untagged item");

        Ok(ItemWithTags { item, tags })
    }
}

/// `alias.col, alias.col, ...` in `ITEM_FIELDS` order
fn item_columns(alias: &str) -> String {
    ITEM_FIELDS
        .iter()
        .map(|field| format!("{alias}.{field}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Timestamp for the next mutation; never earlier than the row's creation.
fn next_update(previous: &Item) -> DateTime<Utc> {
    Utc::now().max(previous.creation_date)
}

async fn fetch_item(
    conn: &mut SqliteConnection,
    item_id: i64,
) -> Result<Option<Item>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM items i WHERE i.item_id = ?1",
        item_columns("i")
    );
    sqlx::query_as(&sql)
        .bind(item_id)
        .fetch_optional(conn)
        .await
}

async fn ensure_tag(conn: &mut SqliteConnection, tag_id: i64) -> Result<(), DbError> {
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM tags WHERE tag_id = ?1)")
        .bind(tag_id)
        .fetch_one(conn)
        .await?;

    if exists.0 {
        Ok(())
    } else {
        Err(DbError::not_found("Tag", tag_id))
    }
}

/// Refresh `last_update` after an association change.
async fn touch(conn: &mut SqliteConnection, previous: &Item) -> Result<Item, sqlx::Error> {
    let sql = format!(
        "UPDATE items SET last_update = ?1 WHERE item_id = ?2 RETURNING {}",
        ITEM_FIELDS.join(", ")
    );
    sqlx::query_as(&sql)
        .bind(next_update(previous))
        .bind(previous.item_id)
        .fetch_one(conn)
        .await
}

async fn tags_for_item(
    conn: &mut SqliteConnection,
    item_id: i64,
) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT t.tag_id, t.tag_name
        FROM item_tags it
        JOIN tags t ON t.tag_id = it.tag_id
        WHERE it.item_id = ?1
        ORDER BY t.tag_name, t.tag_id
        "#,
    )
    .bind(item_id)
    .fetch_all(conn)
    .await
}

/// Load tags for many items at once and pair them up, preserving order.
async fn attach_tags(
    conn: &mut SqliteConnection,
    items: Vec<Item>,
) -> Result<Vec<ItemWithTags>, sqlx::Error> {
    let mut by_item: HashMap<i64, Vec<Tag>> = HashMap::new();

    for chunk in items.chunks(TAG_BATCH) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT it.item_id, t.tag_id, t.tag_name \
             FROM item_tags it JOIN tags t ON t.tag_id = it.tag_id \
             WHERE it.item_id IN (",
        );
        let mut ids = qb.separated(", ");
        for item in chunk {
            ids.push_bind(item.item_id);
        }
        ids.push_unseparated(") ORDER BY t.tag_name, t.tag_id");

        let rows: Vec<(i64, i64, String)> =
            qb.build_query_as().fetch_all(&mut *conn).await?;

        for (item_id, tag_id, tag_name) in rows {
            by_item
                .entry(item_id)
                .or_default()
                .push(Tag { tag_id, tag_name });
        }
    }

    Ok(items
        .into_iter()
        .map(|item| {
            let tags = by_item.remove(&item.item_id).unwrap_or_default();
            ItemWithTags { item, tags }
        })
        .collect())
}
