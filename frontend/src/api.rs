//! Typed calls to the 小李生活志 backend.
//!
//! Every call sends the active locale as the `lang` query parameter, and
//! dashboard calls add the session token as a bearer credential. Calls never
//! fail: errors come back inside the [`ResponseEnvelope`].

use std::sync::Arc;

use url::form_urlencoded;
use xiaoli_shared::{
    paths, Locale, MediaAsset, MediaKind, Payment, Profile, ProfileUpdate, ResponseEnvelope,
    SavedBlog, Section,
};

use crate::{
    http::{FileUpload, HttpClient, HttpMethod, RequestBody, RequestOptions},
    i18n::{self, fill_one},
    progress::UploadObserver,
};

/// Query parameter carrying the locale.
pub const LANG_PARAM: &str = "lang";

/// Multipart field name the media upload endpoints read.
pub const MEDIA_UPLOAD_FIELD: &str = "file";

const MIB: u64 = 1024 * 1024;

fn localized(locale: Locale) -> RequestOptions {
    RequestOptions::new().param(LANG_PARAM, locale.as_str())
}

fn authorized(locale: Locale, token: &str) -> RequestOptions {
    localized(locale).header("Authorization", format!("Bearer {token}"))
}

/// Site sections, localized.
pub async fn fetch_section_lists(
    client: &HttpClient,
    locale: Locale,
) -> ResponseEnvelope<Vec<Section>> {
    let envelope: ResponseEnvelope<Vec<Section>> =
        client.get(paths::SECTION_LISTS, localized(locale)).await;
    envelope.map(|mut sections| {
        sections.sort_by_key(|section| section.order);
        sections
    })
}

/// Profile of the session owner.
pub async fn fetch_profile(
    client: &HttpClient,
    locale: Locale,
    token: &str,
) -> ResponseEnvelope<Profile> {
    client.get(paths::PROFILE, authorized(locale, token)).await
}

/// Apply `update` to the session owner's profile; returns the saved profile.
pub async fn update_profile(
    client: &HttpClient,
    locale: Locale,
    token: &str,
    update: &ProfileUpdate,
) -> ResponseEnvelope<Profile> {
    let body = match serde_json::to_value(update) {
        Ok(body) => body,
        Err(err) => return ResponseEnvelope::no_response(format!("invalid profile update: {err}")),
    };
    client
        .execute(HttpMethod::Put, paths::PROFILE, authorized(locale, token).json(body))
        .await
}

/// Bookmarked blogs, localized.
pub async fn fetch_saved_blogs(
    client: &HttpClient,
    locale: Locale,
    token: &str,
) -> ResponseEnvelope<Vec<SavedBlog>> {
    client.get(paths::SAVED_BLOGS, authorized(locale, token)).await
}

/// Drop the bookmark on `blog_id`.
pub async fn remove_saved_blog(
    client: &HttpClient,
    token: &str,
    blog_id: &str,
) -> ResponseEnvelope<()> {
    let id = form_urlencoded::byte_serialize(blog_id.as_bytes()).collect::<String>();
    let path = format!("{}/{id}", paths::SAVED_BLOGS);
    let options = RequestOptions::new().header("Authorization", format!("Bearer {token}"));
    client.execute(HttpMethod::Delete, &path, options).await
}

/// Payment history, newest first as the backend orders it.
pub async fn fetch_payments(
    client: &HttpClient,
    locale: Locale,
    token: &str,
) -> ResponseEnvelope<Vec<Payment>> {
    client.get(paths::PAYMENTS, authorized(locale, token)).await
}

/// Assets already uploaded for `kind`.
pub async fn list_media(
    client: &HttpClient,
    locale: Locale,
    token: &str,
    kind: MediaKind,
) -> ResponseEnvelope<Vec<MediaAsset>> {
    client.get(&kind.library_path(), authorized(locale, token)).await
}

/// Check a file against the picker's limits for `kind`; the error is the
/// localized message shown in the picker.
pub fn validate_media(locale: Locale, kind: MediaKind, upload: &FileUpload) -> Result<(), String> {
    let catalog = i18n::catalog(locale);
    if !kind.accepts(&upload.mime_type) {
        return Err(fill_one(catalog.media_unsupported_type_template, &upload.mime_type));
    }
    if upload.content.len() as u64 > kind.max_bytes() {
        return Err(fill_one(catalog.media_too_large_template, kind.max_bytes() / MIB));
    }
    Ok(())
}

/// Upload one file through the picker of `kind`.
///
/// Files the picker would reject are refused locally with
/// [`xiaoli_shared::NO_RESPONSE_STATUS`] and never reach the network.
pub async fn upload_media(
    client: &HttpClient,
    locale: Locale,
    token: &str,
    kind: MediaKind,
    upload: FileUpload,
    observer: Option<Arc<dyn UploadObserver>>,
) -> ResponseEnvelope<MediaAsset> {
    if let Err(message) = validate_media(locale, kind, &upload) {
        tracing::info!(
            kind = %kind,
            file = %upload.file_name,
            mime = %upload.mime_type,
            size = upload.content.len(),
            "upload rejected before sending"
        );
        return ResponseEnvelope::no_response(message);
    }

    let mut options = authorized(locale, token).body(RequestBody::File(upload));
    if let Some(observer) = observer {
        options = options.on_upload_progress(observer);
    }
    client.post(&kind.upload_path(), options).await
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn file(mime: &str, size: usize) -> FileUpload {
        FileUpload {
            field_name: MEDIA_UPLOAD_FIELD.to_string(),
            file_name: "photo.png".to_string(),
            mime_type: mime.to_string(),
            content: Bytes::from(vec![0_u8; size]),
        }
    }

    #[test]
    fn rejects_wrong_type_with_localized_message() {
        let err = validate_media(Locale::Zh, MediaKind::Image, &file("video/mp4", 10))
            .expect_err("video is not an image");
        assert_eq!(err, "不支持的文件类型：video/mp4");
    }

    #[test]
    fn rejects_oversized_file() {
        let size = (MediaKind::Image.max_bytes() + 1) as usize;
        let err = validate_media(Locale::En, MediaKind::Image, &file("image/png", size))
            .expect_err("too large");
        assert_eq!(err, "File exceeds the 10 MB limit");
    }

    #[test]
    fn accepts_file_within_limits() {
        let upload = file("image/png; q=1", 1024);
        assert!(validate_media(Locale::En, MediaKind::Image, &upload).is_ok());
    }
}
