pub mod schema;

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::domain::*;
use crate::error::{Error, Result};
use crate::media::extract_links;

/// How an upsert treats a row that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the stored fields with the new values.
    Overwrite,
    /// Leave the stored row untouched.
    KeepExisting,
}

// Overwrites are `ON CONFLICT DO UPDATE` rather than `INSERT OR REPLACE`: with
// foreign keys on, REPLACE deletes the old row first and cascades to its children.

const UPSERT_USER: &str = "
    INSERT INTO users (pk, username, full_name, is_private, profile_pic_url)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(pk) DO UPDATE SET
        username = excluded.username,
        full_name = excluded.full_name,
        is_private = excluded.is_private,
        profile_pic_url = excluded.profile_pic_url";

const INSERT_USER_IF_ABSENT: &str = "
    INSERT OR IGNORE INTO users (pk, username, full_name, is_private, profile_pic_url)
    VALUES (?1, ?2, ?3, ?4, ?5)";

const UPSERT_COLLECTION: &str = "
    INSERT INTO collections (pk, name) VALUES (?1, ?2)
    ON CONFLICT(pk) DO UPDATE SET name = excluded.name";

const INSERT_COLLECTION_IF_ABSENT: &str =
    "INSERT OR IGNORE INTO collections (pk, name) VALUES (?1, ?2)";

const UPSERT_POST: &str = "
    INSERT INTO posts (pk, code, taken_at, media_type, comment_likes_enabled,
        comment_threading_enabled, has_more_comments, user_pk, photo_of_you,
        caption_text, post_json, like_count, has_viewer_saved)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(pk) DO UPDATE SET
        code = excluded.code,
        taken_at = excluded.taken_at,
        media_type = excluded.media_type,
        comment_likes_enabled = excluded.comment_likes_enabled,
        comment_threading_enabled = excluded.comment_threading_enabled,
        has_more_comments = excluded.has_more_comments,
        user_pk = excluded.user_pk,
        photo_of_you = excluded.photo_of_you,
        caption_text = excluded.caption_text,
        post_json = excluded.post_json,
        like_count = excluded.like_count,
        has_viewer_saved = excluded.has_viewer_saved";

/// SQLite-backed store for saved posts, their owners, collections and media URLs.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create a catalog at the given path with WAL mode.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // ── Users ────────────────────────────────────────────────────────

    pub fn save_user(&self, user: &User, mode: WriteMode) -> Result<()> {
        write_user(&self.conn, user, mode)
    }

    pub fn get_user(&self, pk: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT pk, username, full_name, is_private, profile_pic_url
                 FROM users WHERE pk = ?1",
                params![pk],
                |row| {
                    Ok(User {
                        pk: row.get(0)?,
                        username: row.get(1)?,
                        full_name: row.get(2)?,
                        is_private: row.get(3)?,
                        profile_pic_url: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    // ── Collections ──────────────────────────────────────────────────

    /// Save a collection. With `KeepExisting` an existing name is never touched;
    /// with `Overwrite` the name is replaced (including by `None`).
    pub fn save_collection(&self, pk: &str, name: Option<&str>, mode: WriteMode) -> Result<()> {
        write_collection(&self.conn, pk, name, mode)
    }

    pub fn all_collections(&self) -> Result<Vec<Collection>> {
        let mut stmt = self
            .conn
            .prepare("SELECT pk, name FROM collections ORDER BY pk")?;
        let collections = stmt
            .query_map([], |row| {
                Ok(Collection {
                    pk: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(collections)
    }

    /// Ids of collections whose name has not been resolved yet.
    pub fn pending_collection_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT pk FROM collections WHERE name IS NULL ORDER BY pk")?;
        let pks = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(pks)
    }

    /// Post ids saved into the given collection.
    pub fn collection_members(&self, collection_pk: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT post_pk FROM collection_relations WHERE collection_pk = ?1 ORDER BY post_pk",
        )?;
        let pks = stmt
            .query_map(params![collection_pk], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(pks)
    }

    /// Collection ids the given post currently belongs to.
    pub fn post_collections(&self, post_pk: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection_pk FROM collection_relations WHERE post_pk = ?1 ORDER BY collection_pk",
        )?;
        let pks = stmt
            .query_map(params![post_pk], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(pks)
    }

    // ── Posts ────────────────────────────────────────────────────────

    /// Persist one post with its owner, collection memberships and media URLs.
    /// Everything commits together or not at all.
    pub fn save_post(&mut self, post: &PostRecord) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_post(&tx, post)?;
        tx.commit()?;
        Ok(())
    }

    /// Save many posts in a single transaction. One bad record rolls back the batch.
    pub fn save_posts(&mut self, posts: &[PostRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for post in posts {
            write_post(&tx, post)?;
        }
        tx.commit()?;
        Ok(posts.len())
    }

    pub fn get_post(&self, pk: &str) -> Result<Option<StoredPost>> {
        let post = self
            .conn
            .query_row(
                "SELECT pk, code, taken_at, media_type, comment_likes_enabled,
                        comment_threading_enabled, has_more_comments, user_pk, photo_of_you,
                        caption_text, post_json, like_count, has_viewer_saved
                 FROM posts WHERE pk = ?1",
                params![pk],
                |row| {
                    Ok(StoredPost {
                        pk: row.get(0)?,
                        code: row.get(1)?,
                        taken_at: row.get(2)?,
                        media_type: row.get(3)?,
                        comment_likes_enabled: row.get(4)?,
                        comment_threading_enabled: row.get(5)?,
                        has_more_comments: row.get(6)?,
                        user_pk: row.get(7)?,
                        photo_of_you: row.get(8)?,
                        caption_text: row.get(9)?,
                        post_json: row.get(10)?,
                        like_count: row.get(11)?,
                        has_viewer_saved: row.get(12)?,
                    })
                },
            )
            .optional()?;
        Ok(post)
    }

    /// Delete a post. Its URL rows and collection memberships go with it.
    pub fn remove_post(&self, pk: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM posts WHERE pk = ?1", params![pk])?;
        Ok(removed > 0)
    }

    pub fn count_posts(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Media URLs ───────────────────────────────────────────────────

    pub fn post_urls(&self, post_pk: &str) -> Result<Vec<PostUrl>> {
        let mut stmt = self.conn.prepare(
            "SELECT post_pk, url, ind, media_type, height, width, download_path
             FROM post_urls WHERE post_pk = ?1 ORDER BY ind",
        )?;
        let urls = stmt
            .query_map(params![post_pk], |row| {
                Ok(PostUrl {
                    post_pk: row.get(0)?,
                    url: row.get(1)?,
                    index: row.get(2)?,
                    media_type: row.get(3)?,
                    height: row.get(4)?,
                    width: row.get(5)?,
                    download_path: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(urls)
    }

    /// Every media URL without a recorded download path, with what is needed to fetch it.
    pub fn pending_media_downloads(&self) -> Result<Vec<PendingDownload>> {
        let mut stmt = self.conn.prepare(
            "SELECT posts.pk, posts.code, post_urls.url, post_urls.ind
             FROM post_urls JOIN posts ON post_urls.post_pk = posts.pk
             WHERE post_urls.download_path IS NULL
             ORDER BY posts.pk, post_urls.ind",
        )?;
        let pending = stmt
            .query_map([], |row| {
                Ok(PendingDownload {
                    post_pk: row.get(0)?,
                    code: row.get(1)?,
                    url: row.get(2)?,
                    index: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pending)
    }

    /// Ids of posts with at least one media URL still to download.
    pub fn undownloaded_posts(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT posts.pk
             FROM posts JOIN post_urls ON posts.pk = post_urls.post_pk
             WHERE post_urls.download_path IS NULL
             ORDER BY posts.pk",
        )?;
        let pks = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(pks)
    }

    /// Record where a media URL was saved, relative to the media root.
    pub fn record_download(&self, post_pk: &str, url: &str, download_path: &str) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE post_urls SET download_path = ?3 WHERE post_pk = ?1 AND url = ?2",
            params![post_pk, url, download_path],
        )?;
        if updated == 0 {
            return Err(Error::UrlNotFound {
                post_pk: post_pk.to_string(),
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Get all catalog statistics in a single query.
    pub fn stats_summary(&self) -> Result<CatalogStats> {
        let stats = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM collections),
                (SELECT COUNT(*) FROM collections WHERE name IS NULL),
                (SELECT COUNT(*) FROM posts),
                (SELECT COUNT(*) FROM post_urls),
                (SELECT COUNT(*) FROM post_urls WHERE download_path IS NOT NULL)",
            [],
            |row| {
                Ok(CatalogStats {
                    total_users: row.get::<_, i64>(0)? as usize,
                    total_collections: row.get::<_, i64>(1)? as usize,
                    unnamed_collections: row.get::<_, i64>(2)? as usize,
                    total_posts: row.get::<_, i64>(3)? as usize,
                    total_urls: row.get::<_, i64>(4)? as usize,
                    downloaded_urls: row.get::<_, i64>(5)? as usize,
                })
            },
        )?;
        Ok(stats)
    }
}

fn write_user(conn: &Connection, user: &User, mode: WriteMode) -> Result<()> {
    let sql = match mode {
        WriteMode::Overwrite => UPSERT_USER,
        WriteMode::KeepExisting => INSERT_USER_IF_ABSENT,
    };
    conn.execute(
        sql,
        params![
            user.pk,
            user.username,
            user.full_name,
            user.is_private,
            user.profile_pic_url,
        ],
    )?;
    Ok(())
}

fn write_collection(conn: &Connection, pk: &str, name: Option<&str>, mode: WriteMode) -> Result<()> {
    let sql = match mode {
        WriteMode::Overwrite => UPSERT_COLLECTION,
        WriteMode::KeepExisting => INSERT_COLLECTION_IF_ABSENT,
    };
    conn.execute(sql, params![pk, name])?;
    Ok(())
}

/// All writes for one post, without committing. Links are extracted before the
/// first write so malformed media never reaches the store.
fn write_post(conn: &Connection, post: &PostRecord) -> Result<()> {
    let media = &post.media;
    let links = extract_links(&media.content)?;

    let mut seen = HashSet::new();
    let memberships: Vec<&str> = media
        .saved_collection_ids
        .iter()
        .map(String::as_str)
        .filter(|pk| seen.insert(*pk))
        .collect();

    write_user(conn, &media.user, WriteMode::KeepExisting)?;
    for collection_pk in &memberships {
        write_collection(conn, collection_pk, None, WriteMode::KeepExisting)?;
    }

    conn.execute(
        UPSERT_POST,
        params![
            media.pk,
            media.code,
            media.taken_at,
            media.content.media_type,
            media.comment_likes_enabled,
            media.comment_threading_enabled,
            media.has_more_comments,
            media.user.pk,
            media.photo_of_you,
            media.caption_text(),
            post.raw,
            media.like_count,
            media.has_viewer_saved,
        ],
    )?;

    // Existing URL rows keep their download_path.
    let mut insert_url = conn.prepare_cached(
        "INSERT OR IGNORE INTO post_urls (post_pk, url, ind, media_type, height, width)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut new_urls = 0usize;
    for (index, link) in links.iter().enumerate() {
        new_urls += insert_url.execute(params![
            media.pk,
            link.url,
            index as i64,
            link.media_type.code(),
            link.height,
            link.width,
        ])?;
    }

    conn.execute(
        "DELETE FROM collection_relations WHERE post_pk = ?1",
        params![media.pk],
    )?;
    let mut insert_relation = conn.prepare_cached(
        "INSERT INTO collection_relations (post_pk, collection_pk) VALUES (?1, ?2)",
    )?;
    for collection_pk in &memberships {
        insert_relation.execute(params![media.pk, collection_pk])?;
    }

    debug!(
        post = %media.pk,
        code = %media.code,
        links = links.len(),
        new_urls,
        collections = memberships.len(),
        "saved post"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image_content(tag: &str) -> serde_json::Value {
        json!({
            "media_type": 1,
            "image_versions2": {"candidates": [
                {"width": 1080, "height": 1080, "url": format!("https://cdn.example.com/{tag}_1080.jpg?ig_cache_key=x")},
                {"width": 240, "height": 240, "url": format!("https://cdn.example.com/{tag}_240.jpg")}
            ]}
        })
    }

    fn make_post(pk: &str, collections: &[&str], content: serde_json::Value) -> PostRecord {
        let mut media = json!({
            "pk": pk,
            "code": format!("code{pk}"),
            "taken_at": "1499717881",
            "comment_likes_enabled": true,
            "comment_threading_enabled": true,
            "has_more_comments": false,
            "user": {
                "pk": "40268558",
                "username": "kegrand",
                "full_name": "Katie Grand",
                "is_private": false,
                "profile_pic_url": "https://cdn.example.com/avatar.jpg"
            },
            "photo_of_you": false,
            "caption": {"text": "first caption"},
            "like_count": 2040,
            "has_viewer_saved": true,
            "saved_collection_ids": collections,
        });
        for (key, value) in content.as_object().unwrap() {
            media[key] = value.clone();
        }
        PostRecord::from_value(json!({ "media": media })).unwrap()
    }

    fn image_post(pk: &str, collections: &[&str]) -> PostRecord {
        make_post(pk, collections, image_content(pk))
    }

    fn carousel_post(pk: &str, items: usize) -> PostRecord {
        let children: Vec<_> = (0..items)
            .map(|i| image_content(&format!("{pk}_{i}")))
            .collect();
        make_post(pk, &["c1"], json!({"media_type": 8, "carousel_media": children}))
    }

    /// Every row of every table, for whole-store comparisons.
    fn dump(catalog: &Catalog) -> Vec<String> {
        let tables = [
            ("users", "pk"),
            ("collections", "pk"),
            ("posts", "pk"),
            ("collection_relations", "post_pk, collection_pk"),
            ("post_urls", "post_pk, url"),
        ];
        let mut rows = Vec::new();
        for (table, order) in tables {
            let mut stmt = catalog
                .conn
                .prepare(&format!("SELECT * FROM {table} ORDER BY {order}"))
                .unwrap();
            let columns = stmt.column_count();
            let mut query = stmt.query([]).unwrap();
            while let Some(row) = query.next().unwrap() {
                let values: Vec<String> = (0..columns)
                    .map(|i| format!("{:?}", row.get_ref(i).unwrap()))
                    .collect();
                rows.push(format!("{table}: {}", values.join(" | ")));
            }
        }
        rows
    }

    // ── Schema ───────────────────────────────────────────────────

    #[test]
    fn test_open_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested/dir/insta.sqlite");
        Catalog::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_open_under_a_file_fails_with_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let result = Catalog::open(&blocker.join("insta.sqlite"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_open_on_a_non_database_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("insta.sqlite");
        std::fs::write(&db_path, "this is not an sqlite database, just some text".repeat(50)).unwrap();

        let result = Catalog::open(&db_path);
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_catalog_tables_exist() {
        let catalog = Catalog::open_in_memory().unwrap();
        let mut stmt = catalog
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            tables,
            vec!["collection_relations", "collections", "post_urls", "posts", "users"]
        );
    }

    #[test]
    fn test_post_urls_columns() {
        let catalog = Catalog::open_in_memory().unwrap();
        let mut stmt = catalog
            .conn
            .prepare("SELECT name FROM pragma_table_info('post_urls') ORDER BY cid")
            .unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            columns,
            vec!["post_pk", "url", "ind", "media_type", "height", "width", "download_path"]
        );
    }

    #[test]
    fn test_initialize_is_idempotent_and_non_destructive() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&image_post("1001", &["c1"])).unwrap();
        schema::initialize(&catalog.conn).unwrap();
        schema::initialize(&catalog.conn).unwrap();
        assert_eq!(catalog.count_posts().unwrap(), 1);
    }

    // ── save_post ────────────────────────────────────────────────

    #[test]
    fn test_save_post_writes_every_relation() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let post = image_post("1114834611136085885", &["17878861282073803"]);
        catalog.save_post(&post).unwrap();

        let stored = catalog.get_post("1114834611136085885").unwrap().unwrap();
        assert_eq!(stored.code, "code1114834611136085885");
        assert_eq!(stored.taken_at, 1499717881);
        assert_eq!(stored.media_type, 1);
        assert_eq!(stored.user_pk, "40268558");
        assert_eq!(stored.caption_text, "first caption");
        assert_eq!(stored.post_json, post.raw);
        assert_eq!(stored.like_count, 2040);
        assert!(stored.has_viewer_saved);
        assert!(stored.comment_likes_enabled);
        assert!(!stored.has_more_comments);

        let user = catalog.get_user("40268558").unwrap().unwrap();
        assert_eq!(user.username, "kegrand");

        assert_eq!(
            catalog.all_collections().unwrap(),
            vec![Collection {
                pk: "17878861282073803".to_string(),
                name: None
            }]
        );
        assert_eq!(
            catalog.post_collections("1114834611136085885").unwrap(),
            vec!["17878861282073803"]
        );

        let urls = catalog.post_urls("1114834611136085885").unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].index, 0);
        assert_eq!(urls[0].media_type, 1);
        assert_eq!((urls[0].width, urls[0].height), (1080, 1080));
        assert!(urls[0].url.contains("_1080.jpg"));
        assert!(urls[0].download_path.is_none());
    }

    #[test]
    fn test_save_post_twice_is_idempotent_and_keeps_download_path() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let post = carousel_post("2002", 3);
        catalog.save_post(&post).unwrap();

        let first_url = catalog.post_urls("2002").unwrap()[0].url.clone();
        catalog
            .record_download("2002", &first_url, "002/code2002.0.jpg")
            .unwrap();
        let before = dump(&catalog);

        catalog.save_post(&post).unwrap();
        assert_eq!(dump(&catalog), before);
        assert_eq!(
            catalog.post_urls("2002").unwrap()[0].download_path.as_deref(),
            Some("002/code2002.0.jpg")
        );
    }

    #[test]
    fn test_membership_replaced_on_resync() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&image_post("3003", &["A", "B"])).unwrap();
        catalog.save_post(&image_post("3003", &["B", "C"])).unwrap();

        assert_eq!(catalog.post_collections("3003").unwrap(), vec!["B", "C"]);
        assert!(catalog.collection_members("A").unwrap().is_empty());
        // The collection itself stays known even without members.
        let pks: Vec<String> = catalog
            .all_collections()
            .unwrap()
            .into_iter()
            .map(|c| c.pk)
            .collect();
        assert_eq!(pks, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_membership_emptied_on_resync() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&image_post("3004", &["A"])).unwrap();
        catalog.save_post(&image_post("3004", &[])).unwrap();
        assert!(catalog.post_collections("3004").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_collection_ids_collapsed() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&image_post("3005", &["A", "B", "A"])).unwrap();
        assert_eq!(catalog.post_collections("3005").unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_post_fields_overwritten_on_resync() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&image_post("4004", &["c1"])).unwrap();

        let mut edited = image_post("4004", &["c1"]);
        edited.media.like_count = 9000;
        edited.media.caption = None;
        catalog.save_post(&edited).unwrap();

        let stored = catalog.get_post("4004").unwrap().unwrap();
        assert_eq!(stored.like_count, 9000);
        assert_eq!(stored.caption_text, "");
        assert_eq!(catalog.count_posts().unwrap(), 1);
    }

    #[test]
    fn test_embedded_user_keeps_first_seen_version() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&image_post("5001", &["c1"])).unwrap();

        let mut later = image_post("5002", &["c1"]);
        later.media.user.username = "renamed".to_string();
        catalog.save_post(&later).unwrap();

        let user = catalog.get_user("40268558").unwrap().unwrap();
        assert_eq!(user.username, "kegrand");
    }

    #[test]
    fn test_user_overwrite_does_not_cascade_to_posts() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let post = image_post("5003", &["c1"]);
        catalog.save_post(&post).unwrap();

        let mut user = post.media.user.clone();
        user.full_name = "Katie Eleanor Grand".to_string();
        user.is_private = true;
        catalog.save_user(&user, WriteMode::Overwrite).unwrap();

        assert_eq!(catalog.get_user("40268558").unwrap(), Some(user));
        assert_eq!(catalog.count_posts().unwrap(), 1);
        assert_eq!(catalog.post_urls("5003").unwrap().len(), 1);
    }

    #[test]
    fn test_save_post_never_clears_collection_name() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog
            .save_collection("A", Some("Architecture"), WriteMode::Overwrite)
            .unwrap();
        catalog.save_post(&image_post("6006", &["A"])).unwrap();

        assert_eq!(
            catalog.all_collections().unwrap(),
            vec![Collection {
                pk: "A".to_string(),
                name: Some("Architecture".to_string())
            }]
        );
    }

    #[test]
    fn test_collection_write_modes() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.save_collection("A", None, WriteMode::KeepExisting).unwrap();
        catalog
            .save_collection("A", Some("ignored"), WriteMode::KeepExisting)
            .unwrap();
        assert_eq!(catalog.all_collections().unwrap()[0].name, None);

        catalog
            .save_collection("A", Some("Facades"), WriteMode::Overwrite)
            .unwrap();
        assert_eq!(
            catalog.all_collections().unwrap()[0].name.as_deref(),
            Some("Facades")
        );
    }

    #[test]
    fn test_carousel_urls_keep_child_order() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&carousel_post("7007", 6)).unwrap();

        let urls = catalog.post_urls("7007").unwrap();
        assert_eq!(urls.len(), 6);
        for (i, url) in urls.iter().enumerate() {
            assert_eq!(url.index as usize, i);
            assert!(url.url.contains(&format!("7007_{i}_1080")));
        }
    }

    #[test]
    fn test_unrecognized_media_type_writes_nothing() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let post = make_post("8008", &["A"], json!({"media_type": 99}));

        let err = catalog.save_post(&post).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedMediaType(99)));
        assert!(dump(&catalog).is_empty());
    }

    #[test]
    fn test_failed_batch_rolls_back_earlier_posts() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let posts = vec![
            image_post("9001", &["A"]),
            make_post("9002", &["B"], json!({"media_type": 1})),
        ];

        let err = catalog.save_posts(&posts).unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }));
        assert!(dump(&catalog).is_empty());
    }

    #[test]
    fn test_save_posts_batch() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let posts = vec![image_post("9101", &["A"]), carousel_post("9102", 2)];
        assert_eq!(catalog.save_posts(&posts).unwrap(), 2);
        assert_eq!(catalog.count_posts().unwrap(), 2);
        assert_eq!(catalog.pending_media_downloads().unwrap().len(), 3);
    }

    // ── Queries ──────────────────────────────────────────────────

    #[test]
    fn test_pending_collection_names() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&image_post("1101", &["B", "A"])).unwrap();
        assert_eq!(catalog.pending_collection_names().unwrap(), vec!["A", "B"]);

        catalog
            .save_collection("A", Some("Named"), WriteMode::Overwrite)
            .unwrap();
        assert_eq!(catalog.pending_collection_names().unwrap(), vec!["B"]);
    }

    #[test]
    fn test_pending_downloads_follow_download_path() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&carousel_post("1201", 3)).unwrap();
        catalog.save_post(&image_post("1202", &["A"])).unwrap();

        let all = catalog.pending_media_downloads().unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].post_pk, "1201");
        assert_eq!(all[0].code, "code1201");
        assert_eq!(
            all.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 0]
        );

        catalog
            .record_download("1201", &all[1].url, "201/001/code1201.1.jpg")
            .unwrap();
        catalog
            .record_download("1202", &all[3].url, "202/001/code1202.0.jpg")
            .unwrap();

        let remaining = catalog.pending_media_downloads().unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|p| p.post_pk == "1201"));
        assert!(remaining.iter().all(|p| p.url != all[1].url));
        assert_eq!(catalog.undownloaded_posts().unwrap(), vec!["1201"]);
    }

    #[test]
    fn test_record_download_unknown_url() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&image_post("1301", &[])).unwrap();
        let err = catalog
            .record_download("1301", "https://cdn.example.com/other.jpg", "x.jpg")
            .unwrap_err();
        assert!(matches!(err, Error::UrlNotFound { .. }));
    }

    #[test]
    fn test_remove_post_cascades() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.save_post(&carousel_post("1401", 2)).unwrap();

        assert!(catalog.remove_post("1401").unwrap());
        assert!(!catalog.remove_post("1401").unwrap());
        assert!(catalog.post_urls("1401").unwrap().is_empty());
        assert!(catalog.post_collections("1401").unwrap().is_empty());
        assert!(catalog.pending_media_downloads().unwrap().is_empty());
        // Users and collections are not owned by the post.
        assert!(catalog.get_user("40268558").unwrap().is_some());
        assert_eq!(catalog.all_collections().unwrap().len(), 1);
    }

    #[test]
    fn test_stats_summary() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.stats_summary().unwrap(), CatalogStats::default());

        catalog.save_post(&carousel_post("1501", 2)).unwrap();
        catalog.save_post(&image_post("1502", &["A"])).unwrap();
        let url = catalog.post_urls("1502").unwrap()[0].url.clone();
        catalog.record_download("1502", &url, "p.jpg").unwrap();
        catalog
            .save_collection("A", Some("Named"), WriteMode::Overwrite)
            .unwrap();

        let stats = catalog.stats_summary().unwrap();
        assert_eq!(
            stats,
            CatalogStats {
                total_users: 1,
                total_collections: 2,
                unnamed_collections: 1,
                total_posts: 2,
                total_urls: 3,
                downloaded_urls: 1,
            }
        );
    }

    // ── Data integrity ───────────────────────────────────────────

    #[test]
    fn test_data_survives_close_and_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("insta.sqlite");
        {
            let mut catalog = Catalog::open(&db_path).unwrap();
            catalog.save_post(&carousel_post("1601", 2)).unwrap();
        }
        {
            let catalog = Catalog::open(&db_path).unwrap();
            assert_eq!(catalog.count_posts().unwrap(), 1);
            assert_eq!(catalog.pending_media_downloads().unwrap().len(), 2);
        }
    }

    #[test]
    fn test_foreign_key_post_urls_requires_post() {
        let catalog = Catalog::open_in_memory().unwrap();
        let result = catalog.conn.execute(
            "INSERT INTO post_urls (post_pk, url, ind, media_type, height, width)
             VALUES ('404', 'https://cdn.example.com/x.jpg', 0, 1, 1, 1)",
            [],
        );
        assert!(result.is_err());
    }
}
