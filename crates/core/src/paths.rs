use std::path::PathBuf;

use crate::domain::PendingDownload;
use crate::error::{Error, Result};

/// Width of one directory level carved out of a post id.
const SHARD_WIDTH: usize = 3;

/// Build the media path (relative to the media root) for one item of a post:
/// `<shards...>/<code>.<index>.<ext>`.
///
/// The numeric post id is cut into 3-digit groups from the least-significant
/// end and the last group becomes the top directory, so consecutive ids fan
/// out across directories. Leading digits that do not fill a group are not
/// used. The extension is the part of the last URL path segment after its
/// final dot, or the whole segment when it has none.
pub fn media_path(post_pk: &str, code: &str, index: u32, url: &str) -> Result<PathBuf> {
    if post_pk.is_empty() || !post_pk.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPostId(post_pk.to_string()));
    }
    if !is_short_code(code) {
        return Err(Error::InvalidShortCode(code.to_string()));
    }

    let mut path = PathBuf::new();
    for shard in shards(post_pk) {
        path.push(shard);
    }
    path.push(format!("{}.{}.{}", code, index, url_extension(url)?));
    Ok(path)
}

/// The directory levels for `post_pk`, most-significant-last. `post_pk` must be ASCII.
fn shards(post_pk: &str) -> impl Iterator<Item = &str> {
    let len = post_pk.len();
    (0..len / SHARD_WIDTH).map(move |i| {
        let end = len - i * SHARD_WIDTH;
        &post_pk[end - SHARD_WIDTH..end]
    })
}

/// Short codes are URL-safe base64: `[A-Za-z0-9_-]+`.
fn is_short_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn url_extension(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw).map_err(|_| Error::InvalidMediaUrl(raw.to_string()))?;
    let last_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let ext = match last_segment.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => last_segment,
    };
    if ext.is_empty() {
        return Err(Error::InvalidMediaUrl(raw.to_string()));
    }
    Ok(ext.to_string())
}

impl PendingDownload {
    /// Where this download lands relative to the media root.
    pub fn media_path(&self) -> Result<PathBuf> {
        media_path(&self.post_pk, &self.code, self.index, &self.url)
    }
}
