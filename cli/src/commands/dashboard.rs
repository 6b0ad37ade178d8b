use anyhow::{bail, Result};
use serde::Serialize;
use xiaoli_frontend::{
    hooks::{self, SESSION_COOKIE},
    i18n::{self, Catalog},
    resolve_locale, CookieJar, FetchContext, Resource,
};

use super::print_json;

pub async fn sections(ctx: &FetchContext, cookies: &CookieJar) -> Result<()> {
    let catalog = i18n::catalog(resolve_locale(cookies));
    let resource = hooks::use_section_lists(ctx, cookies);
    let sections = load(catalog, catalog.sections_title, resource).await?;
    print_json(&sections.unwrap_or_default())
}

pub async fn profile(ctx: &FetchContext, cookies: &CookieJar) -> Result<()> {
    let catalog = i18n::catalog(resolve_locale(cookies));
    let resource = hooks::use_profile(ctx, cookies);
    let profile = load(catalog, catalog.profile_title, resource).await?;
    print_json(&profile)
}

pub async fn saved_blogs(ctx: &FetchContext, cookies: &CookieJar) -> Result<()> {
    let catalog = i18n::catalog(resolve_locale(cookies));
    let resource = hooks::use_saved_blogs(ctx, cookies);
    let blogs = load(catalog, catalog.saved_blogs_title, resource).await?;
    print_list(blogs.unwrap_or_default(), catalog.saved_blogs_empty)
}

pub async fn payments(ctx: &FetchContext, cookies: &CookieJar) -> Result<()> {
    let catalog = i18n::catalog(resolve_locale(cookies));
    let resource = hooks::use_payments(ctx, cookies);
    let payments = load(catalog, catalog.payments_title, resource).await?;
    print_list(payments.unwrap_or_default(), catalog.payments_empty)
}

/// Print `heading`, wait for the first resolution of `resource` and return
/// its data. Headings and status lines go to stderr, data to stdout.
pub(super) async fn load<T>(
    catalog: &Catalog,
    heading: &str,
    mut resource: Resource<T>,
) -> Result<Option<T>>
where
    T: Clone + Send + Sync + 'static,
{
    if resource.key().is_none() {
        bail!("{} (`{SESSION_COOKIE}` cookie)", catalog.sign_in_required);
    }
    eprintln!("{heading}");
    if resource.state().is_loading {
        eprintln!("{}", catalog.loading);
    }
    let state = resource.settled().await;
    if let Some(err) = state.error {
        bail!("{} (status {}): {}", catalog.error_title, err.status, err.message);
    }
    Ok(state.data)
}

fn print_list<T: Serialize>(items: Vec<T>, empty: &str) -> Result<()> {
    if items.is_empty() {
        eprintln!("{empty}");
    }
    print_json(&items)
}

#[cfg(test)]
mod tests {
    use xiaoli_frontend::{ClientConfig, HttpClient};

    use super::*;

    fn offline_context() -> FetchContext {
        let config = ClientConfig::new("http://127.0.0.1:9/api").expect("config");
        FetchContext::new(HttpClient::new(config).expect("client"))
    }

    #[tokio::test]
    async fn dashboard_without_session_asks_to_sign_in_in_cookie_locale() {
        let ctx = offline_context();
        let err = profile(&ctx, &CookieJar::parse("NEXT_LOCALE=zh"))
            .await
            .expect_err("no session");
        assert!(err.to_string().starts_with(i18n::zh_cn::common::SIGN_IN_REQUIRED));

        let err = payments(&ctx, &CookieJar::new())
            .await
            .expect_err("no session");
        assert!(err.to_string().starts_with(i18n::en::common::SIGN_IN_REQUIRED));
        assert!(ctx.store.is_empty());
    }
}
