// src/context.rs

use std::time::Duration;

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderName, HeaderValue,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use tracing::Span;
use url::Url;
use uuid::Uuid;

use crate::config::ScrapeConfig;
use crate::error::{Result, ScraperError};

/// Per-run state shared by the fetcher, the parser and the paginator.
///
/// One context is one browser-like session: a fixed header set, a fixed
/// timeout and a tracing span every page of the run logs under.
#[derive(Debug, Clone)]
pub struct ScrapeContext {
    base: Url,
    search: Url,
    headers: HeaderMap,
    timeout: Duration,
    page_delay: Duration,
    run_id: Uuid,
    span: Span,
}

impl ScrapeContext {
    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        let base = parse_url(&config.base_url)?;
        let search = base
            .join(&config.search_path)
            .map_err(|source| ScraperError::InvalidUrl {
                url: config.search_path.clone(),
                source,
            })?;

        let mut headers = HeaderMap::new();
        insert_header(&mut headers, USER_AGENT, &config.user_agent, "user-agent")?;
        insert_header(&mut headers, ACCEPT, &config.accept, "accept")?;
        insert_header(
            &mut headers,
            ACCEPT_LANGUAGE,
            &config.accept_language,
            "accept-language",
        )?;
        // Accept-Encoding is left to reqwest so it can decompress transparently.
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", id = %run_id);

        Ok(Self {
            base,
            search,
            headers,
            timeout: config.timeout(),
            page_delay: config.page_delay(),
            run_id,
            span,
        })
    }

    /// Same context with a different pause between pages.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// `<base>/search/?text=<term>`
    pub fn search_url(&self, term: &str) -> Url {
        let mut url = self.search.clone();
        url.query_pairs_mut().append_pair("text", term);
        url
    }

    /// Page 1 is the bare search URL; later pages add `page=<n>`.
    pub fn page_url(&self, term: &str, page: u32) -> String {
        let mut url = self.search_url(term);
        if page > 1 {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        url.into()
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| ScraperError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

fn insert_header(
    headers: &mut HeaderMap,
    name: HeaderName,
    value: &str,
    label: &'static str,
) -> Result<()> {
    let value = HeaderValue::from_str(value).map_err(|_| ScraperError::InvalidHeader(label))?;
    headers.insert(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ScrapeContext {
        ScrapeContext::from_config(&ScrapeConfig::default()).unwrap()
    }

    #[test]
    fn first_page_is_the_bare_search_url() {
        let url = ctx().page_url("phones", 1);
        assert_eq!(url, "https://www.ozon.ru/search/?text=phones");
    }

    #[test]
    fn later_pages_carry_a_page_parameter() {
        let url = ctx().page_url("phones", 3);
        assert_eq!(url, "https://www.ozon.ru/search/?text=phones&page=3");
    }

    #[test]
    fn cyrillic_terms_are_percent_encoded() {
        let url = ctx().page_url("ноутбуки", 1);
        assert!(url.starts_with("https://www.ozon.ru/search/?text=%D0%BD"));
    }

    #[test]
    fn browser_headers_are_present() {
        let ctx = ctx();
        let headers = ctx.headers();
        assert!(headers.contains_key(USER_AGENT));
        assert!(headers.contains_key(ACCEPT_LANGUAGE));
        assert_eq!(headers[UPGRADE_INSECURE_REQUESTS], "1");
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let config = ScrapeConfig {
            base_url: "not a url".to_string(),
            ..ScrapeConfig::default()
        };
        assert!(matches!(
            ScrapeContext::from_config(&config),
            Err(ScraperError::InvalidUrl { .. })
        ));
    }
}
