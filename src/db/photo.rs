//! Photo metadata storage.
//!
//! The store owns metadata only; the actual image bytes live with the
//! external host and are referenced by `image_url`, which never changes
//! after insert.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct PhotoStore {
    pool: SqlitePool,
}

/// A stored photo record.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub alt: String,
    pub category_name: String,
    pub category_slug: String,
    pub date_taken: Option<String>,
    pub location: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a photo after a successful host upload.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub alt: String,
    pub category_name: String,
    pub category_slug: String,
    pub date_taken: Option<String>,
    pub location: Option<String>,
}

/// A sparse patch: only `Some` fields are written, everything else is
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct PhotoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt: Option<String>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub date_taken: Option<String>,
    pub location: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PhotoRow {
    id: i64,
    uuid: String,
    title: String,
    description: Option<String>,
    image_url: String,
    alt: String,
    category_name: String,
    category_slug: String,
    date_taken: Option<String>,
    location: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<PhotoRow> for Photo {
    fn from(row: PhotoRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            alt: row.alt,
            category_name: row.category_name,
            category_slug: row.category_slug,
            date_taken: row.date_taken,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PHOTO_COLUMNS: &str = "id, uuid, title, description, image_url, alt, category_name, \
                             category_slug, date_taken, location, created_at, updated_at";

impl PhotoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new photo and return the stored record.
    pub async fn create(&self, input: NewPhoto) -> Result<Photo, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO photos (uuid, title, description, image_url, alt, category_name, \
             category_slug, date_taken, location) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&uuid)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(&input.alt)
        .bind(&input.category_name)
        .bind(&input.category_slug)
        .bind(&input.date_taken)
        .bind(&input.location)
        .execute(&self.pool)
        .await?;

        let row: PhotoRow =
            sqlx::query_as(&format!("SELECT {} FROM photos WHERE uuid = ?", PHOTO_COLUMNS))
                .bind(&uuid)
                .fetch_one(&self.pool)
                .await?;
        Ok(Photo::from(row))
    }

    /// Get a photo by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Photo>, sqlx::Error> {
        let row: Option<PhotoRow> =
            sqlx::query_as(&format!("SELECT {} FROM photos WHERE uuid = ?", PHOTO_COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Photo::from))
    }

    /// List photos newest-first, optionally filtered by exact category slug.
    /// The id tiebreak keeps same-second inserts in insertion order.
    pub async fn list(&self, category_slug: Option<&str>) -> Result<Vec<Photo>, sqlx::Error> {
        let rows: Vec<PhotoRow> = match category_slug {
            Some(slug) => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM photos WHERE category_slug = ? \
                     ORDER BY created_at DESC, id DESC",
                    PHOTO_COLUMNS
                ))
                .bind(slug)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM photos ORDER BY created_at DESC, id DESC",
                    PHOTO_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Photo::from).collect())
    }

    /// Apply a sparse patch to a photo. Fields left as `None` keep their
    /// current value; `image_url` is immutable and cannot be patched.
    /// Returns the updated record, or `None` if the photo does not exist.
    pub async fn update(
        &self,
        uuid: &str,
        patch: PhotoPatch,
    ) -> Result<Option<Photo>, sqlx::Error> {
        let Some(existing) = self.get_by_uuid(uuid).await? else {
            return Ok(None);
        };

        let title = patch.title.unwrap_or(existing.title);
        let description = patch.description.or(existing.description);
        let alt = patch.alt.unwrap_or(existing.alt);
        let category_name = patch.category_name.unwrap_or(existing.category_name);
        let category_slug = patch.category_slug.unwrap_or(existing.category_slug);
        let date_taken = patch.date_taken.or(existing.date_taken);
        let location = patch.location.or(existing.location);

        sqlx::query(
            "UPDATE photos SET title = ?, description = ?, alt = ?, category_name = ?, \
             category_slug = ?, date_taken = ?, location = ?, updated_at = datetime('now') \
             WHERE uuid = ?",
        )
        .bind(&title)
        .bind(&description)
        .bind(&alt)
        .bind(&category_name)
        .bind(&category_slug)
        .bind(&date_taken)
        .bind(&location)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get_by_uuid(uuid).await
    }

    /// Delete a photo by UUID. Returns true if a record was deleted.
    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM photos WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count all stored photos.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM photos")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn sample(title: &str, slug: &str) -> NewPhoto {
        NewPhoto {
            title: title.to_string(),
            description: None,
            image_url: format!("https://host.example/{}.jpg", title),
            alt: title.to_string(),
            category_name: slug.to_string(),
            category_slug: slug.to_string(),
            date_taken: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::open(":memory:").await.unwrap();

        let photo = db
            .photos()
            .create(NewPhoto {
                description: Some("Golden hour".to_string()),
                location: Some("Lofoten".to_string()),
                ..sample("Sunset", "nature")
            })
            .await
            .unwrap();

        let fetched = db.photos().get_by_uuid(&photo.uuid).await.unwrap().unwrap();
        assert_eq!(fetched, photo);
        assert_eq!(fetched.title, "Sunset");
        assert_eq!(fetched.description.as_deref(), Some("Golden hour"));
        assert_eq!(fetched.category_slug, "nature");
        assert_eq!(fetched.location.as_deref(), Some("Lofoten"));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = Database::open(":memory:").await.unwrap();

        db.photos().create(sample("First", "nature")).await.unwrap();
        db.photos().create(sample("Second", "nature")).await.unwrap();
        db.photos().create(sample("Third", "urban")).await.unwrap();

        let all = db.photos().list(None).await.unwrap();
        let titles: Vec<_> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);
    }

    #[tokio::test]
    async fn test_list_by_category_slug() {
        let db = Database::open(":memory:").await.unwrap();

        db.photos().create(sample("Forest", "nature")).await.unwrap();
        db.photos().create(sample("Street", "urban")).await.unwrap();

        let nature = db.photos().list(Some("nature")).await.unwrap();
        assert_eq!(nature.len(), 1);
        assert_eq!(nature[0].title, "Forest");

        // Exact slug match only
        let none = db.photos().list(Some("natur")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_sparse_patch_leaves_other_fields() {
        let db = Database::open(":memory:").await.unwrap();

        let photo = db
            .photos()
            .create(NewPhoto {
                description: Some("Original description".to_string()),
                location: Some("Iceland".to_string()),
                ..sample("Old title", "nature")
            })
            .await
            .unwrap();

        let updated = db
            .photos()
            .update(
                &photo.uuid,
                PhotoPatch {
                    title: Some("New".to_string()),
                    ..PhotoPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.description.as_deref(), Some("Original description"));
        assert_eq!(updated.location.as_deref(), Some("Iceland"));
        assert_eq!(updated.image_url, photo.image_url);
        assert_eq!(updated.created_at, photo.created_at);
    }

    #[tokio::test]
    async fn test_patch_missing_photo_is_none() {
        let db = Database::open(":memory:").await.unwrap();

        let result = db
            .photos()
            .update("no-such-uuid", PhotoPatch::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Database::open(":memory:").await.unwrap();

        let photo = db.photos().create(sample("Doomed", "nature")).await.unwrap();

        assert!(db.photos().delete(&photo.uuid).await.unwrap());
        assert!(db.photos().get_by_uuid(&photo.uuid).await.unwrap().is_none());
        assert!(!db.photos().delete(&photo.uuid).await.unwrap());
    }
}
