use crate::domain::{MediaContent, MediaType};
use crate::error::{Error, Result};

/// One downloadable media variant of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLink {
    pub height: u32,
    pub width: u32,
    pub media_type: MediaType,
    pub url: String,
}

/// Extract the highest-resolution media link for every item in a post.
///
/// The feed lists variants best-first, so the first image candidate or video
/// version is taken. Carousels yield one link per child, in child order; that
/// position becomes the ordinal stored with each URL.
pub fn extract_links(content: &MediaContent) -> Result<Vec<MediaLink>> {
    match MediaType::from_code(content.media_type)? {
        MediaType::Carousel => {
            let children = content
                .carousel_media
                .as_ref()
                .ok_or(Error::MissingField {
                    field: "carousel_media",
                })?;
            if children.is_empty() {
                return Err(Error::MissingField {
                    field: "carousel_media",
                });
            }
            children
                .iter()
                .enumerate()
                .map(|(index, child)| {
                    single_link(child, MediaType::from_code(child.media_type)?, index)
                })
                .collect()
        }
        kind => Ok(vec![single_link(content, kind, 0)?]),
    }
}

/// `index` is the item's position inside its parent, used only for error reporting.
fn single_link(content: &MediaContent, kind: MediaType, index: usize) -> Result<MediaLink> {
    match kind {
        MediaType::Image => {
            let best = content
                .image_versions2
                .as_ref()
                .and_then(|v| v.candidates.first())
                .ok_or(Error::MissingField {
                    field: "image_versions2.candidates",
                })?;
            Ok(MediaLink {
                height: best.height,
                width: best.width,
                media_type: kind,
                url: best.url.clone(),
            })
        }
        MediaType::Video => {
            let best = content
                .video_versions
                .as_ref()
                .and_then(|v| v.first())
                .ok_or(Error::MissingField {
                    field: "video_versions",
                })?;
            Ok(MediaLink {
                height: best.height,
                width: best.width,
                media_type: kind,
                url: best.url.clone(),
            })
        }
        MediaType::Carousel => Err(Error::NestedCarousel { index }),
    }
}
