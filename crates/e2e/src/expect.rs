//! Evaluation of assertions against a live session

use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

use reelcheck_common::routes::markers;
use reelcheck_common::{Route, Target};

use crate::error::{E2eError, E2eResult};
use crate::locator::{Locator, TextPattern};
use crate::page::Page;
use crate::spec::Assertion;

/// Outcome of one assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// The observed state violates the invariant; the message names it
    Fail(String),
}

impl Verdict {
    fn check(ok: bool, message: impl FnOnce() -> String) -> Self {
        if ok {
            Verdict::Pass
        } else {
            Verdict::Fail(message())
        }
    }
}

fn regex(pattern: &str) -> E2eResult<Regex> {
    Regex::new(pattern).map_err(|e| E2eError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Evaluate `assertion` against the current state of `page`.
///
/// Errors are reserved for a broken session or a malformed assertion; a
/// state that disagrees with the assertion is a [`Verdict::Fail`].
pub async fn evaluate(
    page: &mut dyn Page,
    target: &Target,
    checkpoints: &HashMap<String, String>,
    assertion: &Assertion,
) -> E2eResult<Verdict> {
    let verdict = match assertion {
        Assertion::UrlContains { value } => {
            let url = page.url().await?;
            Verdict::check(url.contains(value.as_str()), || {
                format!("expected URL to contain '{}', got {}", value, url)
            })
        }
        Assertion::UrlNotContains { value } => {
            let url = page.url().await?;
            Verdict::check(!url.contains(value.as_str()), || {
                format!("expected URL not to contain '{}', got {}", value, url)
            })
        }
        Assertion::UrlMatches { pattern } => {
            let re = regex(pattern)?;
            let url = page.url().await?;
            Verdict::check(re.is_match(&url), || {
                format!("expected URL to match /{}/, got {}", pattern, url)
            })
        }
        Assertion::UrlNotMatches { pattern } => {
            let re = regex(pattern)?;
            let url = page.url().await?;
            Verdict::check(!re.is_match(&url), || {
                format!("expected URL not to match /{}/, got {}", pattern, url)
            })
        }
        Assertion::AtHome => {
            let url = page.url().await?;
            Verdict::check(target.is_home(&url), || {
                format!("expected to be home at {}, got {}", Target::normalize(target.as_str()), url)
            })
        }
        Assertion::OnRoute { kinds } => {
            let url = page.url().await?;
            let route = Route::classify_str(&url, target);
            Verdict::check(kinds.iter().any(|k| route.is_kind(*k)), || {
                let expected: Vec<String> = kinds.iter().map(ToString::to_string).collect();
                format!(
                    "expected a {} route, got {} at {}",
                    expected.join(" or "),
                    route,
                    url
                )
            })
        }
        Assertion::UrlAtCheckpoint { name } => {
            let url = page.url().await?;
            match checkpoints.get(name) {
                Some(saved) => Verdict::check(Target::normalize(saved) == Target::normalize(&url), || {
                    format!("expected URL to stay at {} ('{}'), got {}", saved, name, url)
                }),
                None => Verdict::Fail(format!("no checkpoint named '{}'", name)),
            }
        }
        Assertion::Count { locator, op, value } => {
            let count = page.query(locator).await?.len();
            Verdict::check(op.holds(count, *value), || {
                format!("expected count of {} {} {}, got {}", locator, op, value, count)
            })
        }
        Assertion::Visible { locator } => {
            let elements = page.query(locator).await?;
            Verdict::check(elements.iter().any(|e| e.visible), || {
                format!("expected {} to be visible ({} matched, none visible)", locator, elements.len())
            })
        }
        Assertion::TextMatches { locator, pattern } => {
            let re = pattern.to_regex()?;
            let elements = page.query(locator).await?;
            Verdict::check(elements.iter().any(|e| re.is_match(&e.text)), || {
                format!(
                    "expected text of {} to match {} ({} elements checked)",
                    locator,
                    pattern,
                    elements.len()
                )
            })
        }
        Assertion::AttributeContains { locator, name, value } => {
            let elements = page.query(locator).await?;
            match elements.first() {
                None => Verdict::Fail(format!("expected {} to exist", locator)),
                Some(element) => {
                    let attr = element.attr(name).unwrap_or_default();
                    Verdict::check(!attr.is_empty() && attr.contains(value.as_str()), || {
                        format!(
                            "expected {} of {} to contain '{}', got '{}'",
                            name, locator, value, attr
                        )
                    })
                }
            }
        }
        Assertion::TextsNonEmpty { locator, sample } => {
            let elements = page.query(locator).await?;
            match elements.iter().take(*sample).position(|e| e.text.trim().is_empty()) {
                Some(index) => Verdict::Fail(format!("{} #{} has no text", locator, index)),
                None => Verdict::Pass,
            }
        }
        Assertion::TextsExclude { locator, words, sample } => {
            let elements = page.query(locator).await?;
            let offending = elements.iter().take(*sample).enumerate().find_map(|(i, e)| {
                let text = e.text.to_lowercase();
                words
                    .iter()
                    .find(|w| text.contains(&w.to_lowercase()))
                    .map(|w| (i, w, e.text.clone()))
            });
            match offending {
                Some((index, word, text)) => Verdict::Fail(format!(
                    "{} #{} contains placeholder '{}': {:?}",
                    locator, index, word, text
                )),
                None => Verdict::Pass,
            }
        }
        Assertion::NoNotFoundResponses => {
            let not_found = page.diagnostics().not_found_responses(target);
            Verdict::check(not_found.is_empty(), || {
                format!("target responded 404 for: {}", not_found.join(", "))
            })
        }
        Assertion::TrailerContract => trailer_contract(page).await?,
        Assertion::NoPageErrors => {
            let errors = page.diagnostics().page_errors();
            Verdict::check(errors.is_empty(), || {
                format!("uncaught page errors: {}", errors.join("; "))
            })
        }
    };

    debug!("{} -> {:?}", assertion.name(), verdict);
    Ok(verdict)
}

/// A detail page either shows a trailer section together with a playback
/// control, or no section at all (optionally with an "unavailable"
/// message). A section without a playback control violates the contract.
async fn trailer_contract(page: &mut dyn Page) -> E2eResult<Verdict> {
    let unavailable = TextPattern::ci(markers::TRAILER_UNAVAILABLE_PATTERN).to_regex()?;

    let announced = page
        .query(&Locator::text(TextPattern::ci(markers::TRAILER_SECTION_PATTERN)))
        .await?
        .into_iter()
        .any(|e| !unavailable.is_match(&e.text));
    let container = !page.query(&Locator::css(markers::TRAILER_CONTAINER)).await?.is_empty();

    if !(announced || container) {
        let message = !page
            .query(&Locator::text(TextPattern::ci(markers::TRAILER_UNAVAILABLE_PATTERN)))
            .await?
            .is_empty();
        debug!("No trailer section (unavailable message shown: {})", message);
        return Ok(Verdict::Pass);
    }

    let playback = page
        .query(&Locator::css(markers::CONTROL).with_text(TextPattern::ci(markers::PLAYBACK_PATTERN)))
        .await?;
    Ok(Verdict::check(!playback.is_empty(), || {
        "trailer section is shown without a playback control".to_string()
    }))
}
