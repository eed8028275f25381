//! Navigation model of the site under test
//!
//! Encodes the known URL space (`/`, `/search?q=`, `/movie/:id`, `/tv/:id`),
//! the structural markers used to recognise page content, and the predicates
//! behind the cross-route invariants (logo returns home, back leaves detail,
//! no not-found responses).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::target::Target;

/// Matches a detail location anywhere in a URL.
pub static DETAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(movie|tv)/\d+").expect("static regex"));

static DETAIL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(movie|tv)/(\d+)/?$").expect("static regex"));

/// URL fragments of static assets that are excluded from the zero-404 check.
pub const STATIC_ASSET_MARKERS: &[&str] = &[
    "apple-touch-icon",
    "favicon",
    "_next/static",
    ".png",
    ".jpg",
];

/// Structural markers of the rendered pages.
///
/// The harness does not control the markup, so these are tag, class and
/// attribute-prefix selectors rather than test ids.
pub mod markers {
    /// Result and popular-list card titles
    pub const RESULT_TITLE: &str = "h2.line-clamp-1";
    /// Empty state shown by the search page
    pub const NO_RESULTS_TEXT: &str = "No results found";
    /// Brand link in the persistent header
    pub const LOGO: &str = r#"header a[href="/"]"#;
    /// Links into movie detail pages
    pub const MOVIE_LINK: &str = r#"a[href^="/movie/"]"#;
    /// Links into movie or tv detail pages
    pub const DETAIL_LINK: &str = r#"a[href^="/movie/"], a[href^="/tv/"]"#;
    /// Search form input
    pub const SEARCH_INPUT: &str = r#"input[name="q"]"#;
    /// Poster images served from the image CDN
    pub const POSTER_IMAGE: &str = r#"img[src*="image.tmdb"]"#;
    /// Image CDN host expected in poster sources
    pub const POSTER_HOST: &str = "image.tmdb.org";
    /// Title of a detail page
    pub const DETAIL_TITLE: &str = "h1, h2";
    /// Section heading of the popular list
    pub const POPULAR_HEADING_PATTERN: &str = "popular|trending";
    /// Elements that can act as a control
    pub const CONTROL: &str = "button, a";
    /// Text of an explicit back control
    pub const BACK_PATTERN: &str = "back|volver|atrás";
    /// Text announcing a trailer section
    pub const TRAILER_SECTION_PATTERN: &str = "trailer|play|watch|video";
    /// Class fragments of a trailer container
    pub const TRAILER_CONTAINER: &str = r#"[class*="trailer"], [class*="video"]"#;
    /// Text of a playback affordance
    pub const PLAYBACK_PATTERN: &str = "play|watch|trailer";
    /// Text of an explicit "no trailer" message
    pub const TRAILER_UNAVAILABLE_PATTERN: &str =
        "trailer.*not.*available|not.*available|unavailable|no.*trailer|sin.*tráiler";
    /// Structural containers every rendered page is expected to have
    pub const MAIN_CONTAINER: &str = "main, section, div.container";
}

/// A location in the site's URL space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Search { term: String },
    MovieDetail { id: u64 },
    TvDetail { id: u64 },
    Other(String),
}

/// Coarse route category used by assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Home,
    Search,
    /// Either a movie or a tv detail page
    Detail,
    MovieDetail,
    TvDetail,
    Other,
}

impl Route {
    /// Path and query of this route, relative to the target base.
    ///
    /// Search terms are percent-encoded, so empty strings, special
    /// characters and long inputs always produce a valid URL.
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Search { term } => format!("/search?q={}", urlencoding::encode(term)),
            Route::MovieDetail { id } => format!("/movie/{}", id),
            Route::TvDetail { id } => format!("/tv/{}", id),
            Route::Other(path) => path.clone(),
        }
    }

    /// Classify a URL observed in the browser.
    pub fn classify(url: &Url, target: &Target) -> Self {
        if !target.same_origin(url) {
            return Route::Other(url.to_string());
        }

        let path = target.relative_path(url);
        match path.as_str() {
            "/" | "" => return Route::Home,
            "/search" | "/search/" => {
                let term = url
                    .query_pairs()
                    .find(|(k, _)| k == "q")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                return Route::Search { term };
            }
            _ => {}
        }

        if let Some(caps) = DETAIL_PATH.captures(&path) {
            if let Ok(id) = caps[2].parse::<u64>() {
                return match &caps[1] {
                    "movie" => Route::MovieDetail { id },
                    _ => Route::TvDetail { id },
                };
            }
        }

        Route::Other(path)
    }

    /// Classify a raw URL string; unparsable input is `Other`.
    pub fn classify_str(url: &str, target: &Target) -> Self {
        match Url::parse(url) {
            Ok(parsed) => Self::classify(&parsed, target),
            Err(_) => Route::Other(url.to_string()),
        }
    }

    pub fn kind(&self) -> RouteKind {
        match self {
            Route::Home => RouteKind::Home,
            Route::Search { .. } => RouteKind::Search,
            Route::MovieDetail { .. } => RouteKind::MovieDetail,
            Route::TvDetail { .. } => RouteKind::TvDetail,
            Route::Other(_) => RouteKind::Other,
        }
    }

    pub fn is_detail(&self) -> bool {
        matches!(self, Route::MovieDetail { .. } | Route::TvDetail { .. })
    }

    /// Whether this route belongs to `kind`. `Detail` covers movie and tv.
    pub fn is_kind(&self, kind: RouteKind) -> bool {
        match kind {
            RouteKind::Detail => self.is_detail(),
            other => self.kind() == other,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "home"),
            Route::Search { term } => write!(f, "search({:?})", term),
            Route::MovieDetail { id } => write!(f, "movie({})", id),
            Route::TvDetail { id } => write!(f, "tv({})", id),
            Route::Other(path) => write!(f, "other({})", path),
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteKind::Home => "home",
            RouteKind::Search => "search",
            RouteKind::Detail => "detail",
            RouteKind::MovieDetail => "movie detail",
            RouteKind::TvDetail => "tv detail",
            RouteKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Whether a URL contains a detail route anywhere.
pub fn is_detail_url(url: &str) -> bool {
    DETAIL_PATTERN.is_match(url)
}

/// Whether a URL carries a not-found indicator.
pub fn has_not_found_indicator(url: &str) -> bool {
    url.contains("404")
}

/// Whether a URL points at a static or icon asset.
pub fn is_static_asset(url: &str) -> bool {
    STATIC_ASSET_MARKERS.iter().any(|m| url.contains(m))
}
