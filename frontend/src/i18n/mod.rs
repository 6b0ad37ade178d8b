//! zh/en message catalogs for the dashboard and the media picker.

pub mod en;
pub mod zh_cn;

use xiaoli_shared::{Locale, MediaKind};

/// Every user-facing string of one locale.
#[derive(Debug)]
pub struct Catalog {
    /// Shown while a resource is loading.
    pub loading: &'static str,
    /// Error banner title.
    pub error_title: &'static str,
    /// Shown when the visitor is not signed in.
    pub sign_in_required: &'static str,
    /// Site section list heading.
    pub sections_title: &'static str,
    /// Profile page heading.
    pub profile_title: &'static str,
    /// Saved-blog page heading.
    pub saved_blogs_title: &'static str,
    /// Empty saved-blog list.
    pub saved_blogs_empty: &'static str,
    /// Payments page heading.
    pub payments_title: &'static str,
    /// Empty payment history.
    pub payments_empty: &'static str,
    /// Picker titles, in [`MediaKind::ALL`] order.
    pub media_picker_titles: [&'static str; 4],
    /// Upload button.
    pub media_upload: &'static str,
    /// Progress label; `{}` is the percentage.
    pub media_uploading_template: &'static str,
    /// Size rejection; `{}` is the limit in MB.
    pub media_too_large_template: &'static str,
    /// Type rejection; `{}` is the MIME type.
    pub media_unsupported_type_template: &'static str,
}

impl Catalog {
    /// Title of the picker modal for `kind`.
    pub fn media_picker_title(&self, kind: MediaKind) -> &'static str {
        let index = MediaKind::ALL
            .iter()
            .position(|candidate| *candidate == kind)
            .unwrap_or_default();
        self.media_picker_titles[index]
    }
}

/// Catalog for `locale`.
pub fn catalog(locale: Locale) -> &'static Catalog {
    match locale {
        Locale::Zh => &zh_cn::CATALOG,
        Locale::En => &en::CATALOG,
    }
}

/// Replace the first `{}` in `template`.
pub fn fill_one(template: &str, value: impl std::fmt::Display) -> String {
    template.replacen("{}", &value.to_string(), 1)
}
