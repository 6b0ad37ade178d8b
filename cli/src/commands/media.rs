use std::{
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use xiaoli_frontend::{
    api::{self, MEDIA_UPLOAD_FIELD},
    hooks::{self, SESSION_COOKIE},
    http::FileUpload,
    i18n::{self, fill_one},
    progress::UploadProgress,
    resolve_locale, CookieJar, CookieSource, FetchContext,
};
use xiaoli_shared::MediaKind;

use super::{dashboard::load, print_json};
use crate::cli::MediaCommands;

pub async fn run(ctx: &FetchContext, cookies: &CookieJar, command: MediaCommands) -> Result<()> {
    match command {
        MediaCommands::List {
            kind,
        } => {
            let catalog = i18n::catalog(resolve_locale(cookies));
            let heading = catalog.media_picker_title(kind);
            let resource = hooks::use_media_library(ctx, cookies, kind);
            let assets = load(catalog, heading, resource).await?;
            print_json(&assets.unwrap_or_default())
        },
        MediaCommands::Upload {
            kind,
            file,
            mime,
        } => upload(ctx, cookies, kind, &file, mime).await,
    }
}

async fn upload(
    ctx: &FetchContext,
    cookies: &CookieJar,
    kind: MediaKind,
    path: &Path,
    mime: Option<String>,
) -> Result<()> {
    let locale = resolve_locale(cookies);
    let catalog = i18n::catalog(locale);
    let Some(token) = cookies.cookie(SESSION_COOKIE) else {
        bail!("{} (`{SESSION_COOKIE}` cookie)", catalog.sign_in_required);
    };
    let upload = read_upload(path, mime).await?;
    eprintln!(
        "{} · {} · {}",
        catalog.media_picker_title(kind),
        catalog.media_upload,
        upload.file_name
    );
    tracing::info!(
        kind = %kind,
        file = %upload.file_name,
        size = upload.content.len(),
        "uploading"
    );

    // 每 10% 打印一次
    let last_decile = Arc::new(AtomicU64::new(0));
    let observer = move |progress: UploadProgress| {
        let Some(fraction) = progress.fraction() else {
            return;
        };
        let percent = (fraction * 100.0).round() as u64;
        let decile = percent / 10;
        if decile > last_decile.swap(decile, Ordering::Relaxed) {
            eprintln!("{}", fill_one(catalog.media_uploading_template, percent));
        }
    };

    let envelope =
        api::upload_media(&ctx.client, locale, &token, kind, upload, Some(Arc::new(observer)))
            .await;
    match envelope.into_result() {
        Ok(asset) => {
            // 上传成功后刷新素材库
            if let Some(key) = hooks::session_key(kind.library_path(), cookies) {
                ctx.store.invalidate(&key);
            }
            print_json(&asset)
        },
        Err(err) => bail!("{}: {}", catalog.error_title, err.message),
    }
}

async fn read_upload(path: &Path, mime: Option<String>) -> Result<FileUpload> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("upload path has no file name")?;
    let mime_type = mime.unwrap_or_else(|| guess_mime(path).to_string());
    Ok(FileUpload {
        field_name: MEDIA_UPLOAD_FIELD.to_string(),
        file_name,
        mime_type,
        content: Bytes::from(content),
    })
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "md" => "text/markdown",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn guesses_mime_from_extension() {
        assert_eq!(guess_mime(Path::new("cover.PNG")), "image/png");
        assert_eq!(guess_mime(Path::new("notes.md")), "text/markdown");
        assert_eq!(guess_mime(Path::new("archive")), "application/octet-stream");
    }

    #[tokio::test]
    async fn reads_upload_from_disk() {
        let mut file = tempfile::Builder::new()
            .suffix(".mp3")
            .tempfile()
            .expect("temp file");
        file.write_all(b"ID3 fake audio").expect("write");

        let upload = read_upload(file.path(), None).await.expect("read");
        assert_eq!(upload.field_name, MEDIA_UPLOAD_FIELD);
        assert_eq!(upload.mime_type, "audio/mpeg");
        assert_eq!(upload.content.as_ref(), b"ID3 fake audio");
        assert!(upload.file_name.ends_with(".mp3"));
    }

    #[tokio::test]
    async fn explicit_mime_wins() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let upload = read_upload(file.path(), Some("text/plain".to_string()))
            .await
            .expect("read");
        assert_eq!(upload.mime_type, "text/plain");
        assert!(upload.content.is_empty());
    }
}
