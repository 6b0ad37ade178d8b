//! Wire contracts shared by the 小李生活志 front-end data layer and its
//! tooling: the response envelope, supported locales, media-picker kinds and
//! the payloads of the dashboard endpoints.

pub mod envelope;
pub mod locale;
pub mod media;

use serde::{Deserialize, Serialize};

pub use envelope::{ApiError, ResponseEnvelope, GENERIC_ERROR_MESSAGE, NO_RESPONSE_STATUS};
pub use locale::{Locale, ParseLocaleError, DEFAULT_LOCALE, LOCALE_COOKIE};
pub use media::{MediaAsset, MediaKind};

/// Backend endpoint paths, relative to the API base URL.
pub mod paths {
    /// Site sections shown on the home page and navigation.
    pub const SECTION_LISTS: &str = "/section/get-section-lists";
    /// Profile of the signed-in user.
    pub const PROFILE: &str = "/user/profile";
    /// Blogs the user bookmarked.
    pub const SAVED_BLOGS: &str = "/blog/saved";
    /// Payment history.
    pub const PAYMENTS: &str = "/payment/list";
}

// 站点栏目
/// One site section, as returned by [`paths::SECTION_LISTS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier.
    pub id: String,
    /// Localized title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Localized description.
    #[serde(default)]
    pub description: Option<String>,
    /// Display order, ascending.
    #[serde(default)]
    pub order: i32,
}

// 个人资料
/// The signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Name shown on the dashboard.
    pub display_name: String,
    /// Contact email.
    pub email: String,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Short biography.
    #[serde(default)]
    pub bio: Option<String>,
}

/// Editable profile fields; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// New biography.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

// 收藏的文章
/// A bookmarked blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedBlog {
    /// Blog identifier.
    pub id: String,
    /// Localized title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Localized summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Cover image URL.
    #[serde(default)]
    pub cover_image: Option<String>,
    /// When the bookmark was created, RFC 3339.
    pub saved_at: String,
}

/// Settlement state of a [`Payment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting confirmation from the provider.
    Pending,
    /// Settled.
    Succeeded,
    /// Rejected by the provider.
    Failed,
    /// Returned to the payer.
    Refunded,
}

// 支付记录
/// One entry of the payment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier.
    pub id: String,
    /// Amount in the currency's minor unit.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Settlement state.
    pub status: PaymentStatus,
    /// What was paid for.
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_uses_snake_case_on_the_wire() {
        let payment: Payment = serde_json::from_str(
            r#"{
                "id": "p-1",
                "amount_cents": 1999,
                "currency": "CNY",
                "status": "succeeded",
                "created_at": "2024-05-01T08:00:00Z"
            }"#,
        )
        .expect("decode payment");
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert!(payment.description.is_none());
    }

    #[test]
    fn section_optional_fields_default() {
        let section: Section =
            serde_json::from_str(r#"{"id":"s1","title":"生活","slug":"life"}"#).expect("decode");
        assert_eq!(section.order, 0);
        assert!(section.description.is_none());
    }
}
