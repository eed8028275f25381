//! Document inspection for server-rendered pages
//!
//! Everything here is synchronous: parsed documents never live across an
//! await point, so callers parse, extract and drop within one call.

use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashMap};
use url::Url;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::ElementInfo;

/// Markers of framework crash pages and error overlays.
const CRASH_MARKERS: &[(&str, &str)] = &[
    (
        "Application error: a client-side exception has occurred",
        "Uncaught client-side exception reported by the application",
    ),
    ("Unhandled Runtime Error", "Unhandled runtime error overlay"),
    ("id=\"__next_error__\"", "Fatal application error document"),
];

/// Elements whose content is never rendered.
const NON_RENDERED: &[&str] = &["head", "script", "style", "template", "noscript", "title", "meta"];

/// Result of clicking or submitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// The browser would load this URL
    Navigate(Url),
    /// Nothing navigable was hit; the location stays the same
    Stay,
}

fn parse_selector(css: &str) -> E2eResult<Selector> {
    Selector::parse(css).map_err(|e| E2eError::Locator {
        css: css.to_string(),
        reason: format!("{:?}", e),
    })
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of an element and its descendants, whitespace collapsed
fn full_text(el: ElementRef<'_>) -> String {
    collapse(&el.text().collect::<String>())
}

/// Text of an element's direct text nodes, whitespace collapsed
fn own_text(el: ElementRef<'_>) -> String {
    let text: String = el
        .children()
        .filter_map(|child| child.value().as_text().map(|t| (&**t).to_string()))
        .collect();
    collapse(&text)
}

fn is_visible(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .all(|node| {
            let element = node.value();
            if NON_RENDERED.contains(&element.name()) || element.attr("hidden").is_some() {
                return false;
            }
            match element.attr("style") {
                Some(style) => {
                    let style: String = style.chars().filter(|c| !c.is_whitespace()).collect();
                    let style = style.to_ascii_lowercase();
                    !(style.contains("display:none") || style.contains("visibility:hidden"))
                }
                None => true,
            }
        })
}

/// Whether the element or one of its ancestors never renders its content
fn in_non_rendered(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|node| NON_RENDERED.contains(&node.value().name()))
}

fn element_info(el: ElementRef<'_>) -> ElementInfo {
    let attributes: BTreeMap<String, String> = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    ElementInfo {
        tag: el.value().name().to_string(),
        text: full_text(el),
        attributes,
        visible: is_visible(el),
    }
}

fn matching<'a>(doc: &'a Html, locator: &Locator) -> E2eResult<Vec<ElementRef<'a>>> {
    let css = if locator.by_text { "body *" } else { locator.css.as_str() };
    let selector = parse_selector(css)?;
    let has = locator.has.as_deref().map(parse_selector).transpose()?;
    let text = locator.text.as_ref().map(|t| t.to_regex()).transpose()?;

    let mut found = Vec::new();
    for el in doc.select(&selector) {
        if locator.by_text && in_non_rendered(el) {
            continue;
        }
        if let Some(has) = &has {
            if el.select(has).next().is_none() {
                continue;
            }
        }
        if let Some(text) = &text {
            let content = if locator.by_text { own_text(el) } else { full_text(el) };
            if !text.is_match(&content) {
                continue;
            }
        }
        found.push(el);
    }

    Ok(match locator.nth {
        Some(n) => found.into_iter().nth(n).into_iter().collect(),
        None => found,
    })
}

/// Elements matching `locator`, in document order.
pub fn query(html: &str, locator: &Locator) -> E2eResult<Vec<ElementInfo>> {
    let doc = Html::parse_document(html);
    Ok(matching(&doc, locator)?.into_iter().map(element_info).collect())
}

/// Whether any element matching `locator` is visible.
pub fn any_visible(html: &str, locator: &Locator) -> E2eResult<bool> {
    let doc = Html::parse_document(html);
    Ok(matching(&doc, locator)?.into_iter().any(is_visible))
}

/// Name of the first form field matching `locator`.
///
/// `Ok(None)` when nothing matched; `Ok(Some(None))` when the field has no
/// name and so never contributes to a submission.
pub fn field_name(html: &str, locator: &Locator) -> E2eResult<Option<Option<String>>> {
    let doc = Html::parse_document(html);
    Ok(matching(&doc, locator)?
        .into_iter()
        .next()
        .map(|el| el.value().attr("name").map(str::to_string)))
}

fn is_submitter(el: ElementRef<'_>) -> bool {
    let element = el.value();
    match element.name() {
        "button" => !matches!(element.attr("type"), Some("button") | Some("reset")),
        "input" => matches!(element.attr("type"), Some("submit") | Some("image")),
        _ => false,
    }
}

fn owning_form(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .find(|node| node.value().name() == "form")
}

fn form_submission(
    form: ElementRef<'_>,
    submitter: Option<ElementRef<'_>>,
    page_url: &Url,
    values: &HashMap<String, String>,
) -> E2eResult<Interaction> {
    let method = form.value().attr("method").unwrap_or("get");
    if !method.eq_ignore_ascii_case("get") {
        tracing::debug!("Ignoring submission of {} form", method);
        return Ok(Interaction::Stay);
    }

    let mut action = match form.value().attr("action") {
        Some(action) if !action.trim().is_empty() => page_url.join(action.trim())?,
        _ => page_url.clone(),
    };

    let fields = parse_selector("input[name], textarea[name], select[name]")?;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for field in form.select(&fields) {
        let element = field.value();
        let name = element.attr("name").unwrap_or_default();
        let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
        if matches!(kind.as_str(), "submit" | "button" | "reset" | "image" | "file")
            || element.attr("disabled").is_some()
        {
            continue;
        }
        if matches!(kind.as_str(), "checkbox" | "radio") && element.attr("checked").is_none() {
            continue;
        }
        let value = values
            .get(name)
            .cloned()
            .or_else(|| element.attr("value").map(str::to_string))
            .unwrap_or_default();
        pairs.push((name.to_string(), value));
    }

    if let Some(submitter) = submitter {
        if let Some(name) = submitter.value().attr("name") {
            let value = submitter.value().attr("value").unwrap_or_default();
            pairs.push((name.to_string(), value.to_string()));
        }
    }

    action.set_fragment(None);
    action.query_pairs_mut().clear().extend_pairs(pairs.iter());
    Ok(Interaction::Navigate(action))
}

/// What clicking the first match of `locator` would do.
///
/// Walks from the element up to the nearest anchor or submit control, the
/// way a click event bubbles. Anything else leaves the page where it is.
/// `Ok(None)` when nothing matched.
pub fn resolve_click(
    html: &str,
    page_url: &Url,
    locator: &Locator,
    values: &HashMap<String, String>,
) -> E2eResult<Option<Interaction>> {
    let doc = Html::parse_document(html);
    let Some(target) = matching(&doc, locator)?.into_iter().next() else {
        return Ok(None);
    };

    for node in std::iter::once(target).chain(target.ancestors().filter_map(ElementRef::wrap)) {
        let element = node.value();
        if element.name() == "a" {
            if let Some(href) = element.attr("href") {
                let href = href.trim();
                if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                    return Ok(Some(Interaction::Stay));
                }
                return Ok(Some(Interaction::Navigate(page_url.join(href)?)));
            }
        }
        if is_submitter(node) {
            return match owning_form(node) {
                Some(form) => form_submission(form, Some(node), page_url, values).map(Some),
                None => Ok(Some(Interaction::Stay)),
            };
        }
    }

    Ok(Some(Interaction::Stay))
}

/// What pressing Enter inside the first match of `locator` would do.
pub fn resolve_submit(
    html: &str,
    page_url: &Url,
    locator: &Locator,
    values: &HashMap<String, String>,
) -> E2eResult<Option<Interaction>> {
    let doc = Html::parse_document(html);
    let Some(target) = matching(&doc, locator)?.into_iter().next() else {
        return Ok(None);
    };

    match owning_form(target) {
        Some(form) => form_submission(form, None, page_url, values).map(Some),
        None => Ok(Some(Interaction::Stay)),
    }
}

/// Scripts, stylesheets, preloads and icons referenced by the document.
pub fn subresources(html: &str, page_url: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let Ok(selector) = parse_selector("script[src], link[href]") else {
        return Vec::new();
    };

    let mut urls: Vec<Url> = Vec::new();
    for el in doc.select(&selector) {
        let element = el.value();
        let reference = if element.name() == "script" {
            element.attr("src")
        } else {
            let rel = element.attr("rel").unwrap_or_default().to_ascii_lowercase();
            let fetched = rel
                .split_whitespace()
                .any(|r| matches!(r, "stylesheet" | "preload" | "modulepreload" | "icon" | "manifest"));
            if fetched {
                element.attr("href")
            } else {
                None
            }
        };

        if let Some(url) = reference.and_then(|r| page_url.join(r.trim()).ok()) {
            if matches!(url.scheme(), "http" | "https") && !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

/// Description of the crash the document reports, if any.
pub fn crash_marker(html: &str) -> Option<&'static str> {
    CRASH_MARKERS
        .iter()
        .find(|(marker, _)| html.contains(marker))
        .map(|(_, description)| *description)
}
