//! Fixture movie site for exercising the harness
//!
//! Serves deterministic server-rendered pages with the same URL space and
//! markup conventions as the real application: a header logo, a search
//! form, popular cards with line-clamped titles and CDN posters, and detail
//! pages with or without a trailer.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use reelcheck_common::{HarnessConfig, Target};

struct Title {
    id: u64,
    name: &'static str,
    trailer: bool,
    back_link: bool,
}

const MOVIES: &[Title] = &[
    Title { id: 27205, name: "Inception", trailer: true, back_link: true },
    Title { id: 603, name: "The Matrix", trailer: false, back_link: false },
    Title { id: 604, name: "The Matrix Reloaded", trailer: true, back_link: false },
    Title { id: 155, name: "The Dark Knight", trailer: true, back_link: true },
    Title { id: 13, name: "Forrest Gump", trailer: false, back_link: false },
    Title { id: 680, name: "Pulp Fiction", trailer: true, back_link: false },
];

const SHOWS: &[Title] = &[
    Title { id: 1399, name: "Game of Thrones", trailer: false, back_link: false },
];

/// Ways the fixture can misbehave
#[derive(Debug, Clone, Default)]
pub struct FixtureOptions {
    /// Home answers 503
    pub unavailable: bool,
    /// Trailer sections are rendered without a playback link
    pub trailer_without_playback: bool,
    /// Detail pages carry a client-side crash overlay
    pub crash_on_detail: bool,
    /// The stylesheet referenced by every page is missing
    pub missing_stylesheet: bool,
    /// Search ignores the term and always shows every movie
    pub search_ignores_term: bool,
    /// The header has no logo link
    pub no_logo: bool,
    /// Every page carries a framework data payload in an inline body script
    pub inline_payload: bool,
    /// No detail page has a trailer
    pub no_trailers: bool,
    /// Detail back controls lead to another detail page
    pub back_to_detail: bool,
    /// The popular heading is wrapped in a link to a detail page
    pub linked_heading: bool,
}

const PAYLOAD: &str = r#"<script>self.__next_f.push([1,"{\"videos\":[],\"autoplay\":false,\"copy\":\"Watch trailer | No results found\"}"])</script>"#;

pub struct Fixture {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Fixture {
    pub async fn start() -> Self {
        Self::start_with(FixtureOptions::default()).await
    }

    pub async fn start_with(options: FixtureOptions) -> Self {
        let app = Router::new()
            .route("/", get(home))
            .route("/search", get(search))
            .route("/movie/:id", get(movie))
            .route("/tv/:id", get(show))
            .route("/styles.css", get(stylesheet))
            .route("/_next/static/chunks/app.js", get(script))
            .with_state(Arc::new(options));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            handle,
        }
    }

    pub fn target(&self) -> Target {
        Target::parse(&self.base_url).unwrap()
    }

    /// Harness config pointed at this fixture, with short timeouts
    pub fn config(&self) -> HarnessConfig {
        config_for(&self.base_url)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn config_for(base_url: &str) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.target.base_url = base_url.to_string();
    config.target.probe_timeout = Duration::from_secs(2);
    config.driver.navigation_timeout = Duration::from_secs(5);
    config.driver.readiness_timeout = Duration::from_secs(2);
    config.driver.load_timeout = Duration::from_secs(2);
    config.runner.scenario_timeout = Duration::from_secs(30);
    config
}

/// A base URL nothing listens on
pub fn closed_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Options = State<Arc<FixtureOptions>>;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn layout(options: &FixtureOptions, title: &str, main: &str) -> String {
    let logo = if options.no_logo {
        "<span>Movies</span>"
    } else {
        r#"<a href="/">Movies</a>"#
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="icon" href="/favicon.ico">
<link rel="stylesheet" href="/styles.css">
<script src="/_next/static/chunks/app.js" defer></script>
</head>
<body>
<header>
{logo}
<form action="/search" method="get">
<input type="text" name="q" placeholder="Search movies">
<button type="submit">Search</button>
</form>
</header>
<main>
{main}
</main>
{payload}
</body>
</html>"#,
        title = escape(title),
        logo = logo,
        main = main,
        payload = if options.inline_payload { PAYLOAD } else { "" },
    )
}

fn card(kind: &str, title: &Title) -> String {
    format!(
        r#"<a href="/{kind}/{id}" class="card">
<img src="https://image.tmdb.org/t/p/w500/{id}.jpg" alt="{name}">
<h2 class="line-clamp-1">{name}</h2>
</a>"#,
        kind = kind,
        id = title.id,
        name = escape(title.name),
    )
}

async fn home(State(options): Options) -> Response {
    if options.unavailable {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }

    let cards: String = MOVIES.iter().map(|m| card("movie", m)).collect();
    let heading = if options.linked_heading {
        r#"<a href="/movie/603"><h1>Popular movies</h1></a>"#
    } else {
        "<h1>Popular movies</h1>"
    };
    let main = format!(
        r#"{}
<div class="grid">{}</div>"#,
        heading, cards
    );
    Html(layout(&options, "Movies", &main)).into_response()
}

async fn search(State(options): Options, Query(params): Query<HashMap<String, String>>) -> Response {
    let term = params.get("q").map(|q| q.trim().to_string()).unwrap_or_default();
    if term.is_empty() {
        return Redirect::to("/").into_response();
    }

    let needle = term.to_lowercase();
    let matches = |t: &&Title| options.search_ignores_term || t.name.to_lowercase().contains(&needle);
    let mut cards: String = MOVIES.iter().filter(matches).map(|m| card("movie", m)).collect();
    cards.extend(SHOWS.iter().filter(matches).map(|s| card("tv", s)));

    let body = if cards.is_empty() {
        "<p>No results found</p>".to_string()
    } else {
        format!(r#"<div class="grid">{}</div>"#, cards)
    };
    let main = format!("<h1>Results for &quot;{}&quot;</h1>\n{}", escape(&term), body);
    Html(layout(&options, "Search", &main)).into_response()
}

fn detail(options: &FixtureOptions, title: &Title) -> String {
    let mut main = format!(
        "<h1>{}</h1>\n<p>Released long ago. Rated highly by critics and audiences.</p>\n",
        escape(title.name)
    );

    if title.back_link {
        if options.back_to_detail {
            main.push_str(r#"<a href="/movie/603">Back</a>"#);
        } else {
            main.push_str(r#"<a href="/">Back</a>"#);
        }
        main.push('\n');
    }

    if title.trailer && !options.no_trailers {
        if options.trailer_without_playback {
            main.push_str(r#"<div class="trailer-container"><h3>Trailer</h3></div>"#);
        } else {
            main.push_str(
                r#"<section class="trailer-section"><h3>Trailer</h3><a href="https://www.youtube.com/watch?v=abc123">Watch trailer</a></section>"#,
            );
        }
    } else {
        main.push_str("<p>Trailer not available</p>");
    }

    if options.crash_on_detail {
        main.push_str("\n<h2>Application error: a client-side exception has occurred (see the browser console for more information).</h2>");
    }

    layout(options, title.name, &main)
}

fn not_found(options: &FixtureOptions) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(layout(options, "Not found", "<h1>This page could not be found</h1>")),
    )
        .into_response()
}

async fn movie(State(options): Options, Path(id): Path<u64>) -> Response {
    match MOVIES.iter().find(|m| m.id == id) {
        Some(title) => Html(detail(&options, title)).into_response(),
        None => not_found(&options),
    }
}

async fn show(State(options): Options, Path(id): Path<u64>) -> Response {
    match SHOWS.iter().find(|s| s.id == id) {
        Some(title) => Html(detail(&options, title)).into_response(),
        None => not_found(&options),
    }
}

async fn stylesheet(State(options): Options) -> Response {
    if options.missing_stylesheet {
        return StatusCode::NOT_FOUND.into_response();
    }
    ([("content-type", "text/css")], "body { margin: 0; }").into_response()
}

async fn script() -> impl IntoResponse {
    ([("content-type", "application/javascript")], "void 0;")
}
