//! Interactive contact reveal
//!
//! The listing page hides contact details behind a click-triggered
//! disclosure: open the reply panel, then reveal the email and phone. The
//! email and phone sequences are wrapped independently so one failing does
//! not prevent the other. Any failure probes the page for a verification
//! challenge; a detected challenge is forwarded to the configured solver
//! and its token carried back in the result. A failed reveal means
//! "contact unavailable", never a failed crawl.

use anyhow::{Context, Result};
use chromiumoxide::page::Page;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::wait_for_element;
use crate::captcha::{ChallengeSolver, SolvedChallenge};
use crate::fetch::USER_AGENT;

const REPLY_BUTTON: &str = "button.reply-button";
const SHOW_EMAIL_BUTTON: &str = "button.show-email";
const MAILTO_LINK: &str = r#"a[href^="mailto:"]"#;
const SHOW_PHONE_BUTTON: &str = "button.show-phone";
const PHONE_SPAN: &str = "span.phone";
const CHALLENGE_IFRAME: &str = "div.h-captcha iframe";

/// Outcome of one contact reveal
#[derive(Debug, Clone, Default)]
pub struct ContactInfo {
    /// Revealed email address
    pub email: Option<String>,
    /// Revealed phone number
    pub phone: Option<String>,
    /// Solve token for a challenge encountered during the reveal, passed
    /// through opaquely for the caller
    pub challenge: Option<SolvedChallenge>,
}

/// Identifies one verification challenge on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub site_key: String,
    pub origin: String,
}

/// Run the full reveal sequence against an already-loaded listing page
pub(crate) async fn run_reveal(
    page: &Page,
    wait: Duration,
    solver: Option<&dyn ChallengeSolver>,
) -> ContactInfo {
    let mut contact = ContactInfo::default();

    match reveal_email(page, wait).await {
        Ok(email) => contact.email = Some(email),
        Err(e) => {
            warn!("error while getting email address: {e:#}");
            contact.challenge = handle_challenge(page, solver).await;
        }
    }

    match reveal_phone(page, wait).await {
        Ok(phone) => contact.phone = Some(phone),
        Err(e) => warn!("error while getting phone number: {e:#}"),
    }

    contact
}

async fn reveal_email(page: &Page, wait: Duration) -> Result<String> {
    let reply = wait_for_element(page, REPLY_BUTTON, wait)
        .await
        .context("reply button not found")?;
    reply.click().await.context("failed to open reply panel")?;

    let show_email = wait_for_element(page, SHOW_EMAIL_BUTTON, wait)
        .await
        .context("show-email button not found")?;
    show_email.click().await.context("failed to reveal email")?;

    let link = wait_for_element(page, MAILTO_LINK, wait)
        .await
        .context("mailto link did not appear")?;
    let href = link
        .attribute("href")
        .await
        .context("failed to read mailto link")?
        .context("mailto link carries no href")?;

    let email = href
        .trim_start_matches("mailto:")
        .split('?')
        .next()
        .unwrap_or("")
        .to_string();
    if email.is_empty() {
        anyhow::bail!("mailto link carried an empty address");
    }
    Ok(email)
}

async fn reveal_phone(page: &Page, wait: Duration) -> Result<String> {
    let show_phone = wait_for_element(page, SHOW_PHONE_BUTTON, wait)
        .await
        .context("show-phone button not found")?;
    show_phone.click().await.context("failed to reveal phone")?;

    let span = wait_for_element(page, PHONE_SPAN, wait)
        .await
        .context("phone element did not appear")?;
    span.inner_text()
        .await
        .context("failed to read phone element")?
        .map(|phone| phone.trim().to_string())
        .filter(|phone| !phone.is_empty())
        .context("phone element was empty")
}

/// Probe for a challenge and forward it to the solver when configured
async fn handle_challenge(
    page: &Page,
    solver: Option<&dyn ChallengeSolver>,
) -> Option<SolvedChallenge> {
    let challenge = probe_challenge(page).await?;
    info!(
        "verification challenge detected (sitekey {})",
        challenge.site_key
    );

    let Some(solver) = solver else {
        warn!("challenge encountered but no solver configured");
        return None;
    };

    match solver
        .solve(&challenge.site_key, &challenge.origin, USER_AGENT)
        .await
    {
        Ok(solved) => Some(solved),
        Err(e) => {
            warn!("challenge solver failed: {e:#}");
            None
        }
    }
}

/// Look for the challenge iframe and extract its sitekey and origin
async fn probe_challenge(page: &Page) -> Option<Challenge> {
    let iframe = page.find_element(CHALLENGE_IFRAME).await.ok()?;
    let src = iframe.attribute("src").await.ok()??;
    parse_challenge_src(&src)
}

/// Extract sitekey and origin from a challenge iframe URL
///
/// The parameters appear in the query string or, on newer frames, in the
/// fragment.
pub(crate) fn parse_challenge_src(src: &str) -> Option<Challenge> {
    let url = Url::parse(src).ok()?;

    fn scan(
        pairs: url::form_urlencoded::Parse<'_>,
        site_key: &mut Option<String>,
        origin: &mut Option<String>,
    ) {
        for (key, value) in pairs {
            match key.as_ref() {
                "sitekey" => *site_key = Some(value.into_owned()),
                "origin" => *origin = Some(value.into_owned()),
                _ => {}
            }
        }
    }

    let mut site_key = None;
    let mut origin = None;
    scan(url.query_pairs(), &mut site_key, &mut origin);
    if site_key.is_none() || origin.is_none() {
        if let Some(fragment) = url.fragment() {
            scan(
                url::form_urlencoded::parse(fragment.as_bytes()),
                &mut site_key,
                &mut origin,
            );
        }
    }

    Some(Challenge {
        site_key: site_key?,
        origin: origin?,
    })
}
