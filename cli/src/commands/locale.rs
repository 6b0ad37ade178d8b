use anyhow::Result;
use serde::Serialize;
use xiaoli_frontend::{resolve_locale, CookieJar, CookieSource};
use xiaoli_shared::{Locale, LOCALE_COOKIE};

#[derive(Serialize)]
struct LocaleReport {
    cookie: Option<String>,
    locale: Locale,
}

pub fn run(cookies: &CookieJar) -> Result<()> {
    super::print_json(&LocaleReport {
        cookie: cookies.cookie(LOCALE_COOKIE),
        locale: resolve_locale(cookies),
    })
}
