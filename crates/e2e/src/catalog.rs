//! Built-in scenarios for the movie site
//!
//! Grouped by the behaviour they cover: search partitions, the popular
//! list, navigation into detail pages, trailer handling, and the
//! back/logo round trips. Every scenario waits on explicit readiness
//! conditions; the only fixed pauses are observation windows in which late
//! page errors are collected.

use reelcheck_common::routes::markers;

use crate::locator::{Locator, TextPattern};
use crate::page::LoadState;
use crate::spec::{Assertion, Comparison, Scenario, Step};

const MOVIE_DETAIL: &str = r"/movie/\d+";
const ANY_DETAIL: &str = r"/(movie|tv)/\d+";

/// Settling window after a client-side navigation
const SETTLE_MS: u64 = 1500;

fn titles() -> Locator {
    Locator::css(markers::RESULT_TITLE)
}

fn first_card_link() -> Locator {
    Locator::css("a").has(markers::RESULT_TITLE).first()
}

fn wait_load(state: LoadState) -> Step {
    Step::WaitForLoad {
        state,
        timeout_ms: None,
    }
}

/// Results or the empty state, whichever renders first.
fn results_ready() -> Step {
    Step::WaitForAny {
        locators: vec![
            titles().first(),
            Locator::text(TextPattern::ci(markers::NO_RESULTS_TEXT)),
        ],
        timeout_ms: None,
    }
}

fn cards_visible() -> Step {
    Step::WaitForAny {
        locators: vec![titles().first()],
        timeout_ms: None,
    }
}

fn search(term: &str) -> Vec<Step> {
    vec![
        Step::Search {
            term: term.to_string(),
        },
        results_ready(),
        wait_load(LoadState::DomContentLoaded),
    ]
}

fn open_home() -> Vec<Step> {
    vec![
        Step::Navigate {
            path: "/".to_string(),
        },
        wait_load(LoadState::NetworkIdle),
    ]
}

/// Click `link` and wait until the URL shows a detail route.
fn open_detail(link: Locator, pattern: &str) -> Vec<Step> {
    vec![
        Step::Click {
            locator: link,
            timeout_ms: None,
        },
        Step::WaitForUrl {
            pattern: pattern.to_string(),
            timeout_ms: None,
        },
        wait_load(LoadState::DomContentLoaded),
    ]
}

fn settle() -> Step {
    Step::Observe { ms: SETTLE_MS }
}

fn title_count(op: Comparison, value: usize) -> Assertion {
    Assertion::Count {
        locator: titles(),
        op,
        value,
    }
}

fn url_contains(value: &str) -> Assertion {
    Assertion::UrlContains {
        value: value.to_string(),
    }
}

fn no_not_found_indicator() -> Assertion {
    Assertion::UrlNotContains {
        value: "404".to_string(),
    }
}

fn url_matches(pattern: &str) -> Assertion {
    Assertion::UrlMatches {
        pattern: pattern.to_string(),
    }
}

fn search_partition(name: &str, description: &str, term: &str, found: bool) -> Scenario {
    let scenario = Scenario::new(name, description)
        .tag("search")
        .steps(search(term))
        .expect(url_contains("/search"));

    if found {
        scenario.expect(title_count(Comparison::Gt, 0)).expect(Assertion::TextMatches {
            locator: titles(),
            pattern: TextPattern::ci(regex::escape(term)),
        })
    } else {
        scenario.expect(title_count(Comparison::Eq, 0))
    }
}

/// Search input equivalence partitions
pub fn search_scenarios() -> Vec<Scenario> {
    vec![
        search_partition("CE-01", "Complete title \"Inception\" returns results", "Inception", true)
            .tag("smoke"),
        search_partition("CE-02", "Fragment \"Matrix\" returns results", "Matrix", true),
        search_partition(
            "CE-03",
            "Non-existent text \"zzzxxyyqwe123\" returns no results",
            "zzzxxyyqwe123",
            false,
        )
        .tag("smoke"),
        Scenario::new("CE-04", "Empty term is handled without a crash")
            .tag("search")
            .steps(open_home())
            .step(Step::Fill {
                locator: Locator::css(markers::SEARCH_INPUT),
                value: String::new(),
            })
            .step(Step::Search { term: String::new() })
            .step(wait_load(LoadState::DomContentLoaded))
            .step(Step::Observe { ms: 1000 })
            .expect(Assertion::OnRoute {
                kinds: vec![
                    reelcheck_common::RouteKind::Home,
                    reelcheck_common::RouteKind::Search,
                ],
            })
            .expect(Assertion::NoPageErrors),
        search_partition(
            "CE-05",
            "Special characters only \"@@@@@\" return no results",
            "@@@@@",
            false,
        ),
        search_partition(
            "CE-06",
            "Very long text (100 characters) returns no results",
            &"a".repeat(100),
            false,
        ),
    ]
}

/// Popular list on the home page
pub fn popular_scenarios() -> Vec<Scenario> {
    let poster = Locator::css(markers::POSTER_IMAGE);

    vec![
        Scenario::new("LP-01", "Popular movies are listed with titles and posters")
            .tag("popular")
            .tag("smoke")
            .steps(open_home())
            .expect(Assertion::Visible {
                locator: Locator::text(TextPattern::ci(markers::POPULAR_HEADING_PATTERN)).first(),
            })
            .step(cards_visible())
            .expect(title_count(Comparison::Gte, 3))
            .expect(Assertion::TextsNonEmpty {
                locator: titles(),
                sample: 3,
            })
            .expect(Assertion::Count {
                locator: poster.clone(),
                op: Comparison::Gt,
                value: 0,
            })
            .expect(Assertion::AttributeContains {
                locator: poster.first(),
                name: "src".to_string(),
                value: markers::POSTER_HOST.to_string(),
            }),
        Scenario::new("LP-01-alt", "Popular cards have real, non-placeholder titles")
            .tag("popular")
            .steps(open_home())
            .step(cards_visible())
            .expect(title_count(Comparison::Gte, 5))
            .expect(title_count(Comparison::Lte, 50))
            .expect(Assertion::TextsNonEmpty {
                locator: titles(),
                sample: 5,
            })
            .expect(Assertion::TextsExclude {
                locator: titles(),
                words: vec!["loading".to_string(), "error".to_string()],
                sample: 5,
            }),
        Scenario::new("LP-02", "Home page stays stable without uncaught errors")
            .tag("popular")
            .step(Step::Navigate {
                path: "/".to_string(),
            })
            .expect(Assertion::Count {
                locator: Locator::css("body"),
                op: Comparison::Eq,
                value: 1,
            })
            .step(Step::Observe { ms: 3000 })
            .expect(Assertion::NoPageErrors)
            .expect(Assertion::Visible {
                locator: Locator::css("body"),
            }),
        Scenario::new("LP-02-alt", "Home page keeps its structure whatever the list holds")
            .tag("popular")
            .step(Step::Navigate {
                path: "/".to_string(),
            })
            .step(Step::Observe { ms: 3000 })
            .expect(Assertion::Count {
                locator: Locator::css("body"),
                op: Comparison::Eq,
                value: 1,
            })
            .expect(Assertion::Count {
                locator: Locator::css(markers::MAIN_CONTAINER),
                op: Comparison::Gt,
                value: 0,
            })
            .expect(Assertion::TextsNonEmpty {
                locator: titles(),
                sample: 1,
            }),
    ]
}

/// Navigation from the popular list into detail pages
pub fn detail_scenarios() -> Vec<Scenario> {
    let detail_title = Locator::css(markers::DETAIL_TITLE).first();

    vec![
        Scenario::new("NAV-P01", "Clicking a popular card opens its detail page")
            .tag("navigation")
            .tag("smoke")
            .steps(open_home())
            .step(cards_visible())
            .steps(open_detail(first_card_link(), MOVIE_DETAIL))
            .expect(url_matches(MOVIE_DETAIL))
            .step(Step::WaitForAny {
                locators: vec![detail_title.clone()],
                timeout_ms: Some(10_000),
            })
            .expect(Assertion::Count {
                locator: detail_title.clone(),
                op: Comparison::Gt,
                value: 0,
            })
            .expect(Assertion::TextsNonEmpty {
                locator: detail_title,
                sample: 1,
            }),
        Scenario::new("NAV-P02", "Clicking outside a card does not navigate")
            .tag("navigation")
            .steps(open_home())
            .step(Step::Checkpoint {
                name: "initial".to_string(),
            })
            .step(cards_visible())
            .step(Step::Click {
                locator: Locator::text(TextPattern::ci(markers::POPULAR_HEADING_PATTERN)).first(),
                timeout_ms: None,
            })
            .step(settle())
            .expect(Assertion::UrlAtCheckpoint {
                name: "initial".to_string(),
            })
            .expect(Assertion::Visible {
                locator: titles().first(),
            }),
    ]
}

fn trailer_scenario(name: &str, description: &str, window_ms: u64) -> Scenario {
    Scenario::new(name, description)
        .tag("trailer")
        .steps(open_home())
        .step(cards_visible())
        .steps(open_detail(first_card_link(), MOVIE_DETAIL))
        .step(wait_load(LoadState::NetworkIdle))
        .expect(Assertion::Count {
            locator: Locator::css("body"),
            op: Comparison::Eq,
            value: 1,
        })
        .expect(Assertion::TrailerContract)
        .step(Step::Observe { ms: window_ms })
        .expect(Assertion::NoPageErrors)
}

/// Trailer presence on detail pages
pub fn trailer_scenarios() -> Vec<Scenario> {
    vec![
        trailer_scenario(
            "R1",
            "A trailer section always comes with a playback control",
            1000,
        )
        .expect(Assertion::Count {
            locator: Locator::css(markers::DETAIL_TITLE),
            op: Comparison::Gt,
            value: 0,
        }),
        trailer_scenario(
            "R2",
            "Without a trailer the page shows nothing or an unavailable message",
            2000,
        ),
    ]
}

/// Back and logo round trips
pub fn round_trip_scenarios() -> Vec<Scenario> {
    let movie_link = || Locator::css(markers::MOVIE_LINK).first();

    vec![
        Scenario::new("BACK-01", "Back from a detail page leaves the detail route")
            .tag("navigation")
            .steps(open_home())
            .step(cards_visible())
            .steps(open_detail(movie_link(), MOVIE_DETAIL))
            .expect(url_matches(MOVIE_DETAIL))
            .step(Step::Back { timeout_ms: None })
            .step(settle())
            .expect(Assertion::UrlNotMatches {
                pattern: MOVIE_DETAIL.to_string(),
            })
            .expect(no_not_found_indicator()),
        Scenario::new("LOGO-01", "Logo returns home from a detail page")
            .tag("navigation")
            .tag("smoke")
            .steps(open_home())
            .steps(open_detail(movie_link(), MOVIE_DETAIL))
            .expect(url_matches(MOVIE_DETAIL))
            .step(Step::ClickLogo)
            .step(settle())
            .expect(Assertion::AtHome)
            .expect(Assertion::NoNotFoundResponses),
        Scenario::new("LOGO-02", "Logo returns home from search results")
            .tag("navigation")
            .step(Step::Search {
                term: "Inception".to_string(),
            })
            .step(wait_load(LoadState::NetworkIdle))
            .expect(url_contains("/search"))
            .step(Step::ClickLogo)
            .step(settle())
            .expect(Assertion::AtHome)
            .expect(no_not_found_indicator()),
        Scenario::new("NAV-01", "Home, search, detail, logo, home")
            .tag("navigation")
            .steps(open_home())
            .expect(Assertion::AtHome)
            .step(Step::Search {
                term: "Matrix".to_string(),
            })
            .step(wait_load(LoadState::NetworkIdle))
            .expect(url_contains("/search"))
            .steps(open_detail(
                Locator::css(markers::DETAIL_LINK).first(),
                ANY_DETAIL,
            ))
            .expect(url_matches(ANY_DETAIL))
            .step(Step::ClickLogo)
            .step(settle())
            .expect(Assertion::AtHome)
            .expect(no_not_found_indicator())
            .expect(Assertion::NoNotFoundResponses),
        Scenario::new("ERROR-01", "No 404 responses while navigating")
            .tag("navigation")
            .steps(open_home())
            .expect(no_not_found_indicator())
            .step(Step::Search {
                term: "Test".to_string(),
            })
            .expect(no_not_found_indicator())
            .step(Step::GoBack { timeout_ms: None })
            .step(wait_load(LoadState::DomContentLoaded))
            .step(settle())
            .expect(Assertion::AtHome)
            .expect(Assertion::NoNotFoundResponses),
        Scenario::new("NAV-02", "URLs stay coherent through detail and back home")
            .tag("navigation")
            .steps(open_home())
            .expect(Assertion::AtHome)
            .step(Step::Click {
                locator: movie_link(),
                timeout_ms: None,
            })
            .step(Step::WaitForUrl {
                pattern: MOVIE_DETAIL.to_string(),
                timeout_ms: None,
            })
            .expect(url_matches(MOVIE_DETAIL))
            .expect(no_not_found_indicator())
            .step(Step::ClickLogo)
            .step(settle())
            .expect(Assertion::AtHome)
            .expect(Assertion::UrlNotMatches {
                pattern: MOVIE_DETAIL.to_string(),
            }),
    ]
}

/// Every built-in scenario, in catalog order
pub fn builtin() -> Vec<Scenario> {
    let mut scenarios = search_scenarios();
    scenarios.extend(popular_scenarios());
    scenarios.extend(detail_scenarios());
    scenarios.extend(trailer_scenarios());
    scenarios.extend(round_trip_scenarios());
    scenarios
}

/// Look up a built-in scenario by name (case-insensitive)
pub fn find(name: &str) -> Option<Scenario> {
    builtin()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}
