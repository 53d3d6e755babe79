//! End-to-end crawls against the scripted engine

use crate::support::{config, crawl, html, key, url, RecordingReporter, Reply, ScriptedEngine};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wayfinder::crawler::{
    CollectedRecord, FetchError, FetchErrorKind, FetchedPage, ScriptResult,
};
use wayfinder::{Controller, CrawlState};

#[tokio::test]
async fn test_forced_domain_keeps_crawl_in_docs() {
    let engine = ScriptedEngine::new()
        .page(
            "https://site.test/docs/",
            html(
                "docs home",
                &["intro", "/blog/post", "https://other.test/docs/x", "/docs/api"],
            )
            .with_final_url("https://site.test/docs/"),
        )
        .page("https://site.test/docs/intro", html("intro", &["/docs/"]))
        .page("https://site.test/docs/api", html("api", &["/blog"]))
        .build();

    let mut config = config("https://site.test/docs/");
    config.crawl.force_domain = Some("https://site.test/docs/*".to_string());
    config.crawl.max_pages = 20;

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(
        engine.calls(),
        vec![
            key("https://site.test/docs"),
            key("https://site.test/docs/intro"),
            key("https://site.test/docs/api"),
        ]
    );
    assert_eq!(report.skipped.get("outside_forced_domain"), Some(&3));
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_links_toward_target_are_fetched_first() {
    let engine = ScriptedEngine::new()
        .page("https://site.test/", html("home", &["/other", "/x/page"]))
        .page("https://site.test/x/page", html("near", &["/other2", "/x"]))
        .page("https://site.test/x", html("target", &["/x/more"]))
        .page("https://site.test/other", html("other", &[]))
        .build();

    let mut config = config("https://site.test/");
    config.crawl.stop_target = Some("https://site.test/x".to_string());

    let (controller, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::StoppedByTarget);
    assert_eq!(
        engine.calls(),
        vec![
            key("https://site.test/"),
            key("https://site.test/x/page"),
            key("https://site.test/x"),
        ]
    );

    // Links on the target page are never offered
    let visited = controller.snapshot().visited;
    assert_eq!(visited.len(), 5);
    assert!(!visited.contains(&url("https://site.test/x/more")));
    assert_eq!(report.stop_target, Some(url("https://site.test/x")));
}

#[tokio::test]
async fn test_target_reached_through_redirect() {
    let engine = ScriptedEngine::new()
        .page("https://site.test/", html("home", &["/old"]))
        .page(
            "https://site.test/old",
            html("moved", &["/beyond"]).with_final_url("https://site.test/new/"),
        )
        .build();

    let mut config = config("https://site.test/");
    config.crawl.stop_target = Some("https://site.test/new".to_string());

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::StoppedByTarget);
    assert_eq!(engine.call_count("https://site.test/beyond"), 0);
}

#[tokio::test]
async fn test_off_site_links_are_visited_but_never_fetched() {
    let engine = ScriptedEngine::new()
        .page(
            "https://site.test/",
            html("home", &["https://elsewhere.test/a", "/b"]),
        )
        .page("https://site.test/b", html("b", &["https://elsewhere.test/a"]))
        .build();

    let mut config = config("https://site.test/");
    config.crawl.on_site = true;

    let (controller, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(engine.call_count("https://elsewhere.test/a"), 0);
    // The second sighting is a duplicate, not a second rejection
    assert_eq!(report.skipped.get("off_site"), Some(&1));

    let snapshot = controller.snapshot();
    assert!(snapshot.visited.contains(&url("https://elsewhere.test/a")));
    assert_eq!(snapshot.graph.inbound_count(&url("https://elsewhere.test/a")), 2);
    assert_eq!(
        report.link_analysis.most_linked[0].url,
        url("https://elsewhere.test/a")
    );
}

#[tokio::test]
async fn test_exclude_pattern_skips_admin_pages() {
    let engine = ScriptedEngine::new()
        .page("https://site.test/", html("home", &["/admin/panel", "/docs"]))
        .page("https://site.test/docs", html("docs", &[]))
        .page("https://site.test/admin/panel", html("secret", &[]))
        .build();

    let mut config = config("https://site.test/");
    config.crawl.exclude = Some(".*admin.*".to_string());

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(engine.call_count("https://site.test/admin/panel"), 0);
    assert_eq!(engine.call_count("https://site.test/docs"), 1);
    assert_eq!(report.skipped.get("excluded"), Some(&1));
}

#[tokio::test]
async fn test_page_budget_stops_crawl() {
    let engine = ScriptedEngine::new()
        .page(
            "https://site.test/",
            html("home", &["/a", "/b", "/c", "/d", "/e"]),
        )
        .page("https://site.test/a", html("a", &["/a/1"]))
        .page("https://site.test/b", html("b", &["/b/1"]))
        .page("https://site.test/c", html("c", &[]))
        .build();

    let mut config = config("https://site.test/");
    config.crawl.max_pages = 3;

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::StoppedByBudget);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(engine.calls().len(), 3);
    assert_eq!(report.stop_reason.as_deref(), Some("page budget of 3 reached"));
}

#[tokio::test]
async fn test_depth_limit_discards_deep_links() {
    let engine = ScriptedEngine::new()
        .page("https://site.test/", html("home", &["/a"]))
        .page("https://site.test/a", html("a", &["/a/deep"]))
        .build();

    let mut config = config("https://site.test/");
    config.crawl.max_depth = 1;

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(engine.call_count("https://site.test/a/deep"), 0);
    assert_eq!(report.skipped.get("depth"), Some(&1));
    assert_eq!(report.max_depth_reached(), Some(1));
}

fn mesh(size: usize) -> Arc<ScriptedEngine> {
    let pages: Vec<String> = (0..size)
        .map(|i| format!("https://mesh.test/p{}", i))
        .collect();
    let mut engine = ScriptedEngine::new();
    for page in &pages {
        let links: Vec<&str> = pages.iter().map(String::as_str).collect();
        engine = engine.replies(
            page,
            vec![Reply::Slow(Duration::from_millis(5), html("node", &links))],
        );
    }
    engine.build()
}

#[tokio::test]
async fn test_concurrent_workers_never_fetch_twice() {
    let engine = mesh(12);
    let mut config = config("https://mesh.test/p0");
    config.crawl.workers = 4;

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.pages_fetched, 12);
    for i in 0..12 {
        assert_eq!(engine.call_count(&format!("https://mesh.test/p{}", i)), 1);
    }
}

#[tokio::test]
async fn test_concurrent_workers_respect_page_budget() {
    let engine = mesh(12);
    let mut config = config("https://mesh.test/p0");
    config.crawl.workers = 4;
    config.crawl.max_pages = 5;

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::StoppedByBudget);
    assert_eq!(report.pages_fetched, 5);
    assert_eq!(engine.calls().len(), 5);
}

#[tokio::test]
async fn test_unreachable_seed_fails_crawl() {
    let engine = ScriptedEngine::new().build();
    let (_, report) = crawl(config("https://down.test/"), Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Failed);
    assert!(!report.is_success());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].attempts, 3);
    assert_eq!(engine.call_count("https://down.test/"), 3);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let engine = ScriptedEngine::new()
        .replies(
            "https://site.test/",
            vec![
                Reply::Fail(FetchError::timeout("slow start")),
                Reply::Page(html("home", &[])),
            ],
        )
        .build();

    let (_, report) = crawl(config("https://site.test/"), Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.pages_fetched, 1);
    assert!(report.errors.is_empty());
    assert_eq!(engine.call_count("https://site.test/"), 2);
}

#[tokio::test]
async fn test_hanging_engine_times_out() {
    let engine = ScriptedEngine::new()
        .replies(
            "https://site.test/",
            vec![Reply::Slow(Duration::from_secs(5), html("late", &[]))],
        )
        .build();

    let mut config = config("https://site.test/");
    config.fetch.timeout_ms = 100;
    config.fetch.retries = 0;

    let (_, report) = crawl(config, engine).await;

    assert_eq!(report.state, CrawlState::Failed);
    assert_eq!(report.errors[0].kind, FetchErrorKind::Timeout);
    assert_eq!(report.errors[0].attempts, 1);
}

#[tokio::test]
async fn test_broken_link_is_recorded_with_parent() {
    let engine = ScriptedEngine::new()
        .page("https://site.test/", html("home", &["/gone", "/ok"]))
        .page("https://site.test/ok", html("ok", &[]))
        .build();

    let (_, report) = crawl(config("https://site.test/"), engine).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].url, url("https://site.test/gone"));
    assert_eq!(report.errors[0].parent, Some(url("https://site.test/")));
}

#[tokio::test]
async fn test_script_stop_ends_crawl() {
    let script = ScriptResult {
        stop: Some("found the pricing table".to_string()),
        ..ScriptResult::default()
    };
    let engine = ScriptedEngine::new()
        .page(
            "https://site.test/",
            html("home", &["/a"]).with_script(script),
        )
        .page("https://site.test/a", html("a", &[]))
        .build();

    let (_, report) = crawl(config("https://site.test/"), Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::StoppedByExternalSignal);
    assert_eq!(report.stop_reason.as_deref(), Some("found the pricing table"));
    assert_eq!(engine.call_count("https://site.test/a"), 0);
}

#[tokio::test]
async fn test_script_skip_and_records() {
    let script = ScriptResult {
        records: vec![
            CollectedRecord {
                tag: "price".to_string(),
                data: json!({"amount": 10}),
            },
            CollectedRecord {
                tag: " ".to_string(),
                data: json!(2),
            },
        ],
        skip: Some("login wall".to_string()),
        ..ScriptResult::default()
    };
    let engine = ScriptedEngine::new()
        .page(
            "https://site.test/",
            html("home", &["/next"]).with_script(script),
        )
        .page("https://site.test/next", html("next", &[]))
        .build();

    let (controller, report) = crawl(config("https://site.test/"), engine).await;

    assert_eq!(report.records_collected, 1);
    assert_eq!(report.pages_collected, 1);
    assert_eq!(report.skipped.get("not_collected"), Some(&1));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.records[0].record.tag, "price");
    assert_eq!(snapshot.pages[0].skip_reason.as_deref(), Some("login wall"));
    // A skipped page still leads somewhere
    assert!(snapshot.pages[1].collected);
}

#[tokio::test]
async fn test_content_filter_without_following() {
    let engine = ScriptedEngine::new()
        .page(
            "https://site.test/",
            html("Welcome to the INSTALL guide", &["/next"]),
        )
        .page("https://site.test/next", html("nothing here", &["/last"]))
        .page("https://site.test/last", html("install", &[]))
        .build();

    let mut config = config("https://site.test/");
    config.crawl.content_filter = Some("Install".to_string());
    config.crawl.follow_filtered_links = false;

    let (controller, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(engine.call_count("https://site.test/last"), 0);
    assert_eq!(report.pages_collected, 1);
    assert_eq!(controller.snapshot().collected_pages().count(), 1);
}

#[tokio::test]
async fn test_reporter_called_exactly_once() {
    let reporter = Arc::new(RecordingReporter::default());
    let mut config = config("https://mesh.test/p0");
    config.crawl.workers = 4;

    let mut controller =
        Controller::new(config, mesh(8)).with_reporter(Arc::clone(&reporter) as _);
    let report = controller.run().await.unwrap();

    assert_eq!(reporter.calls(), 1);
    assert_eq!(reporter.last_state(), Some(report.state));
    assert!(controller.report().is_some());
}

#[tokio::test]
async fn test_stop_handle_before_run() {
    let engine = ScriptedEngine::new()
        .page("https://site.test/", html("home", &[]))
        .build();
    let mut controller = Controller::new(config("https://site.test/"), Arc::clone(&engine) as _);
    controller.stop_handle().stop("operator");

    let report = controller.run().await.unwrap();

    assert_eq!(report.state, CrawlState::StoppedByExternalSignal);
    assert_eq!(report.pages_fetched, 0);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_non_html_page_is_a_leaf() {
    let engine = ScriptedEngine::new()
        .page("https://site.test/", html("home", &["/file.pdf", "/doc"]))
        .page("https://site.test/doc", FetchedPage::default())
        .build();

    let mut config = config("https://site.test/");
    config.crawl.file_types = Some(vec!["html".to_string()]);

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(engine.call_count("https://site.test/file.pdf"), 0);
    assert_eq!(report.skipped.get("file_type"), Some(&1));
    assert_eq!(report.pages_fetched, 2);
}

#[tokio::test]
async fn test_equal_scores_keep_discovery_order() {
    let engine = ScriptedEngine::new()
        .page("https://a.com/", html("home", &["/x", "/other"]))
        .page("https://a.com/x", html("x", &[]))
        .page("https://a.com/other", html("other", &[]))
        .build();

    let mut config = config("https://a.com");
    config.crawl.stop_target = Some("https://a.com/x/y/z".to_string());

    let (_, report) = crawl(config, Arc::clone(&engine)).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(
        engine.calls(),
        vec![
            key("https://a.com/"),
            key("https://a.com/x"),
            key("https://a.com/other"),
        ]
    );
}
