pub mod dashboard;
pub mod locale;
pub mod media;

use anyhow::{Context, Result};
use serde::Serialize;
use xiaoli_frontend::{
    config::{ENV_API_BASE, ENV_REQUEST_TIMEOUT_MS},
    ClientConfig, CookieJar, FetchContext, HttpClient,
};

use crate::cli::{Cli, Commands};

pub async fn run(cli: Cli) -> Result<()> {
    let cookies = CookieJar::parse(&cli.cookie);
    if let Commands::Locale = cli.command {
        return locale::run(&cookies);
    }

    let config = load_config(cli.api_base.as_deref(), cli.timeout_ms)?;
    tracing::debug!(api_base = %config.api_base(), "using backend");
    let client = HttpClient::new(config).context("failed to build http client")?;
    let ctx = FetchContext::new(client);

    match cli.command {
        Commands::Sections => dashboard::sections(&ctx, &cookies).await,
        Commands::Profile => dashboard::profile(&ctx, &cookies).await,
        Commands::SavedBlogs => dashboard::saved_blogs(&ctx, &cookies).await,
        Commands::Payments => dashboard::payments(&ctx, &cookies).await,
        Commands::Media {
            command,
        } => media::run(&ctx, &cookies, command).await,
        Commands::Locale => locale::run(&cookies),
    }
}

/// CLI flags take precedence over `XIAOLI_*` environment variables.
fn load_config(api_base: Option<&str>, timeout_ms: Option<u64>) -> Result<ClientConfig> {
    ClientConfig::from_lookup(|name| {
        let flag = match name {
            ENV_API_BASE => api_base.map(str::to_string),
            ENV_REQUEST_TIMEOUT_MS => timeout_ms.map(|ms| ms.to_string()),
            _ => None,
        };
        flag.or_else(|| std::env::var(name).ok())
    })
    .context("invalid client configuration")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn flags_override_environment() {
        let config = load_config(Some("http://127.0.0.1:9/api/"), Some(250)).expect("config");
        assert_eq!(config.api_base().as_str(), "http://127.0.0.1:9/api/");
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn zero_timeout_flag_is_an_error() {
        assert!(load_config(Some("http://127.0.0.1:9/api"), Some(0)).is_err());
    }
}
