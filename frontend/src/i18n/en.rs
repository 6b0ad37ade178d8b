//! English

#![allow(missing_docs, reason = "message constants are named after their text")]

use super::Catalog;

/// Shared loading and error strings.
pub mod common {
    pub const LOADING: &str = "Loading...";
    pub const ERROR_TITLE: &str = "Something went wrong";
    pub const SIGN_IN_REQUIRED: &str = "Please sign in first";
}

/// Dashboard page labels.
pub mod dashboard {
    pub const SECTIONS_TITLE: &str = "Sections";
    pub const PROFILE_TITLE: &str = "Profile";
    pub const SAVED_BLOGS_TITLE: &str = "Saved blogs";
    pub const SAVED_BLOGS_EMPTY: &str = "No saved blogs yet";
    pub const PAYMENTS_TITLE: &str = "Payments";
    pub const PAYMENTS_EMPTY: &str = "No payments yet";
}

/// Media picker modal.
pub mod media_picker {
    pub const IMAGE_TITLE: &str = "Insert image";
    pub const VIDEO_TITLE: &str = "Insert video";
    pub const AUDIO_TITLE: &str = "Insert audio";
    pub const DOCUMENT_TITLE: &str = "Insert document";
    pub const UPLOAD: &str = "Upload";
    pub const UPLOADING_TEMPLATE: &str = "Uploading {}%";
    pub const TOO_LARGE_TEMPLATE: &str = "File exceeds the {} MB limit";
    pub const UNSUPPORTED_TYPE_TEMPLATE: &str = "Unsupported file type: {}";
}

/// English strings.
pub const CATALOG: Catalog = Catalog {
    loading: common::LOADING,
    error_title: common::ERROR_TITLE,
    sign_in_required: common::SIGN_IN_REQUIRED,
    sections_title: dashboard::SECTIONS_TITLE,
    profile_title: dashboard::PROFILE_TITLE,
    saved_blogs_title: dashboard::SAVED_BLOGS_TITLE,
    saved_blogs_empty: dashboard::SAVED_BLOGS_EMPTY,
    payments_title: dashboard::PAYMENTS_TITLE,
    payments_empty: dashboard::PAYMENTS_EMPTY,
    media_picker_titles: [
        media_picker::IMAGE_TITLE,
        media_picker::VIDEO_TITLE,
        media_picker::AUDIO_TITLE,
        media_picker::DOCUMENT_TITLE,
    ],
    media_upload: media_picker::UPLOAD,
    media_uploading_template: media_picker::UPLOADING_TEMPLATE,
    media_too_large_template: media_picker::TOO_LARGE_TEMPLATE,
    media_unsupported_type_template: media_picker::UNSUPPORTED_TYPE_TEMPLATE,
};
