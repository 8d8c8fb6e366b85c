use rusqlite::Connection;

use crate::error::Result;

/// Create the five archive relations and their indexes if they are missing.
/// Never drops or alters anything, so it runs on every open.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            pk                          TEXT    PRIMARY KEY,
            username                    TEXT    NOT NULL,
            full_name                   TEXT    NOT NULL,
            is_private                  INTEGER NOT NULL,
            profile_pic_url             TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS collections (
            pk                          TEXT    PRIMARY KEY,
            name                        TEXT
        );

        CREATE TABLE IF NOT EXISTS posts (
            pk                          TEXT    PRIMARY KEY,
            code                        TEXT    NOT NULL,
            taken_at                    INTEGER NOT NULL,
            media_type                  INTEGER NOT NULL,
            comment_likes_enabled       INTEGER NOT NULL,
            comment_threading_enabled   INTEGER NOT NULL,
            has_more_comments           INTEGER NOT NULL,
            user_pk                     TEXT    NOT NULL,
            photo_of_you                INTEGER NOT NULL,
            caption_text                TEXT    NOT NULL,
            post_json                   TEXT    NOT NULL,
            like_count                  INTEGER NOT NULL,
            has_viewer_saved            INTEGER NOT NULL,
            FOREIGN KEY (user_pk) REFERENCES users (pk)
                ON DELETE CASCADE ON UPDATE NO ACTION
        );

        CREATE TABLE IF NOT EXISTS collection_relations (
            post_pk                     TEXT    NOT NULL,
            collection_pk               TEXT    NOT NULL,
            PRIMARY KEY (post_pk, collection_pk),
            FOREIGN KEY (post_pk) REFERENCES posts (pk)
                ON DELETE CASCADE ON UPDATE NO ACTION,
            FOREIGN KEY (collection_pk) REFERENCES collections (pk)
                ON DELETE CASCADE ON UPDATE NO ACTION
        );

        CREATE TABLE IF NOT EXISTS post_urls (
            post_pk                     TEXT    NOT NULL,
            url                         TEXT    NOT NULL,
            ind                         INTEGER NOT NULL,
            media_type                  INTEGER NOT NULL,
            height                      INTEGER NOT NULL,
            width                       INTEGER NOT NULL,
            download_path               TEXT,
            PRIMARY KEY (post_pk, url),
            FOREIGN KEY (post_pk) REFERENCES posts (pk)
                ON DELETE CASCADE ON UPDATE NO ACTION
        );

        CREATE INDEX IF NOT EXISTS idx_post_urls_pending ON post_urls(download_path);
        CREATE INDEX IF NOT EXISTS idx_collection_relations_collection
            ON collection_relations(collection_pk);
        ",
    )?;
    Ok(())
}
