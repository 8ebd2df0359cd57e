//! Auxiliary directories used to enrich dumped heartbeats.
//!
//! Both directories are paginated; every page is fetched before the table is
//! handed to the mapper. A failure on any page fails the whole fetch, no retry
//! happens at this layer.

use super::client::{MACHINE_NAMES_PATH, USER_AGENTS_PATH, read_success_body, with_headers};
use super::types::{MachineEntry, MachineTable, Page, UserAgentEntry, UserAgentTable};
use crate::error::ImportError;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Upper bound on pages followed for a single directory.
const MAX_PAGES: u32 = 1_000;

pub async fn fetch_user_agents(
    http: &Client,
    base_url: &str,
    authorization: &str,
) -> Result<UserAgentTable, ImportError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), USER_AGENTS_PATH);
    let entries: Vec<UserAgentEntry> = fetch_all_pages(http, &url, authorization).await?;
    log::debug!("fetched {} user agents", entries.len());

    Ok(entries
        .into_iter()
        .map(|entry| (entry.id.clone(), entry))
        .collect())
}

pub async fn fetch_machine_names(
    http: &Client,
    base_url: &str,
    authorization: &str,
) -> Result<MachineTable, ImportError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), MACHINE_NAMES_PATH);
    let entries: Vec<MachineEntry> = fetch_all_pages(http, &url, authorization).await?;
    log::debug!("fetched {} machine names", entries.len());

    Ok(entries
        .into_iter()
        .map(|entry| (entry.id.clone(), entry))
        .collect())
}

async fn fetch_all_pages<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    authorization: &str,
) -> Result<Vec<T>, ImportError> {
    let mut entries = Vec::new();
    let mut page: u32 = 1;

    loop {
        let request = http.get(url).query(&[("page", page)]);
        let response = with_headers(request, authorization).send().await?;
        let body = read_success_body(response).await?;
        let parsed: Page<T> = serde_json::from_slice(&body)?;
        entries.extend(parsed.data);

        if !has_next_page(page, parsed.total_pages) {
            break;
        }
        page += 1;
    }

    Ok(entries)
}

fn has_next_page(page: u32, total_pages: Option<u32>) -> bool {
    let total = total_pages.unwrap_or(1).min(MAX_PAGES);
    page < total
}
