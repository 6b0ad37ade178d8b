//! 简体中文

#![allow(missing_docs, reason = "message constants are named after their text")]

use super::Catalog;

/// Shared loading and error strings.
pub mod common {
    pub const LOADING: &str = "加载中...";
    pub const ERROR_TITLE: &str = "发生错误";
    pub const SIGN_IN_REQUIRED: &str = "请先登录";
}

/// Dashboard page labels.
pub mod dashboard {
    pub const SECTIONS_TITLE: &str = "栏目";
    pub const PROFILE_TITLE: &str = "个人资料";
    pub const SAVED_BLOGS_TITLE: &str = "收藏的文章";
    pub const SAVED_BLOGS_EMPTY: &str = "还没有收藏任何文章";
    pub const PAYMENTS_TITLE: &str = "支付记录";
    pub const PAYMENTS_EMPTY: &str = "暂无支付记录";
}

/// Media picker modal.
pub mod media_picker {
    pub const IMAGE_TITLE: &str = "插入图片";
    pub const VIDEO_TITLE: &str = "插入视频";
    pub const AUDIO_TITLE: &str = "插入音频";
    pub const DOCUMENT_TITLE: &str = "插入文档";
    pub const UPLOAD: &str = "上传";
    pub const UPLOADING_TEMPLATE: &str = "上传中 {}%";
    pub const TOO_LARGE_TEMPLATE: &str = "文件超过 {} MB 上限";
    pub const UNSUPPORTED_TYPE_TEMPLATE: &str = "不支持的文件类型：{}";
}

/// 中文文案
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
