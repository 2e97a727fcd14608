use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use url::Url;

use crate::config::SiteConfig;
use crate::core::spider::{ParseResult, SpiderCallback, SpiderConfig, SpiderResponse};
use crate::scrapers::{MockResponse, MockScraper};
use crate::spiders::BeadSpider;
use crate::storage::{FeedDocument, FeedSink, StreamingJsonSink};
use crate::{Crawler, HttpRequest, ScraperResult, Spider};

const SHOP: &str = "http://shop.test";

fn listing_page(codes: &[&str], next: Option<&str>) -> String {
    let tiles: String = codes
        .iter()
        .map(|code| {
            format!(
                r#"<div class="product-tile">
                     <a class="link" href="/p/{code}"><img class="tile-image" src="/img/{code}.jpg"></a>
                     <h3 class="name">Miyuki Delica Beads {code} Opaque</h3>
                   </div>"#
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="page-link-next" href="{href}">Next</a>"#))
        .unwrap_or_default();
    format!("<html><body>{tiles}{next}</body></html>")
}

fn listing_site(max_pages: Option<usize>) -> SiteConfig {
    let mut site = SiteConfig::fire_mountain_gems().unwrap();
    site.allowed_domains = vec!["shop.test".to_string()];
    site.start_urls = vec![Url::parse(&format!("{SHOP}/list")).unwrap()];
    site.max_pages = max_pages;
    site
}

fn read_array(path: &Path) -> Vec<Value> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn page_cap_limits_listing_pages() {
    let scraper = MockScraper::new(vec![
        (
            "http://shop.test/list",
            MockResponse::ok(listing_page(&["DB-0001", "DB-0002"], Some("/list?page=2"))),
        ),
        (
            "http://shop.test/list?page=2",
            MockResponse::ok(listing_page(&["DBS-0003"], Some("/list?page=3"))),
        ),
        (
            "http://shop.test/list?page=3",
            MockResponse::ok(listing_page(&["DBL-0004"], None)),
        ),
    ]);

    let dir = tempdir().unwrap();
    let path = dir.path().join("beads.json");
    let sink = StreamingJsonSink::create(&path).unwrap();
    let spider = BeadSpider::new(listing_site(Some(2)), Box::new(sink)).unwrap();

    let crawler = Crawler::new(Box::new(scraper.clone()));
    let spider = crawler.run(spider).await.unwrap();

    assert_eq!(scraper.fetch_count("http://shop.test/list?page=3"), 0);
    assert_eq!(spider.stats().pages_visited, 2);
    assert_eq!(spider.stats().records_emitted, 3);
    assert_eq!(spider.stats().size_counts.get("15/0"), Some(&1));

    let items = read_array(&path);
    let codes: Vec<_> = items
        .iter()
        .map(|i| i["product_code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(codes, vec!["DB1", "DB2", "DBS3"]);
}

#[tokio::test]
async fn uncapped_crawl_follows_until_no_next_link() {
    let scraper = MockScraper::new(vec![
        (
            "http://shop.test/list",
            MockResponse::ok(listing_page(&["DB-0001"], Some("/list?page=2"))),
        ),
        (
            "http://shop.test/list?page=2",
            MockResponse::ok(listing_page(&["DB-0002"], None)),
        ),
    ]);

    let dir = tempdir().unwrap();
    let path = dir.path().join("feed.json");
    let sink = FeedSink::new(&path, "fire_mountain_gems", "http://shop.test/list");
    let spider = BeadSpider::new(listing_site(None), Box::new(sink)).unwrap();

    let spider = Crawler::new(Box::new(scraper)).run(spider).await.unwrap();
    assert_eq!(spider.stats().pages_visited, 2);

    let document: FeedDocument = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document.metadata.total_results, 2);
    assert_eq!(document.beads[0].image_url.as_deref(), Some("http://shop.test/img/DB-0001.jpg"));
}

#[tokio::test]
async fn error_pages_are_not_parsed() {
    let scraper = MockScraper::new(vec![(
        "http://shop.test/list",
        MockResponse {
            status: 503,
            body: listing_page(&["DB-0001"], None),
            delay: None,
        },
    )]);

    let dir = tempdir().unwrap();
    let path = dir.path().join("beads.json");
    let sink = StreamingJsonSink::create(&path).unwrap();
    let spider = BeadSpider::new(listing_site(None), Box::new(sink)).unwrap();

    let crawler = Crawler::new(Box::new(scraper));
    let spider = crawler.run(spider).await.unwrap();

    assert_eq!(spider.stats().records_emitted, 0);
    assert!(spider.state().is_closed());
    assert!(read_array(&path).is_empty());
    assert_eq!(crawler.stats().get_stats().failed_requests, 1);
}

#[tokio::test]
async fn offsite_next_links_are_filtered() {
    let scraper = MockScraper::new(vec![(
        "http://shop.test/list",
        MockResponse::ok(listing_page(&["DB-0001"], Some("http://elsewhere.test/list"))),
    )]);

    let dir = tempdir().unwrap();
    let sink = StreamingJsonSink::create(dir.path().join("beads.json")).unwrap();
    let spider = BeadSpider::new(listing_site(None), Box::new(sink)).unwrap();

    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler.run(spider).await.unwrap();

    assert_eq!(scraper.fetched_urls(), vec!["http://shop.test/list".to_string()]);
    assert_eq!(crawler.stats().get_stats().offsite_filtered, 1);
}

fn directory_listing(codes: &[&str]) -> String {
    let tiles: String = codes
        .iter()
        .map(|code| {
            format!(
                r#"<li class="product">
                     <a class="woocommerce-LoopProduct-link" href="/directory/{code}/">
                       <img class="attachment-woocommerce_thumbnail" src="/img/{code}.jpg">
                       <h2 class="woocommerce-loop-product__title">Delica {code}</h2>
                     </a>
                   </li>"#
            )
        })
        .collect();
    format!("<html><body><ul>{tiles}</ul></body></html>")
}

fn detail_page(color: &str) -> String {
    format!(
        r#"<table>
             <tr class="woocommerce-product-attributes-item--attribute_pa_color-group">
               <td class="woocommerce-product-attributes-item__value"><p>{color}</p></td>
             </tr>
           </table>"#
    )
}

#[tokio::test]
async fn detail_responses_pair_with_their_own_record() {
    // The first detail page is the slowest, so completions arrive reversed.
    let scraper = MockScraper::new(vec![
        (
            "http://shop.test/directory/",
            MockResponse::ok(directory_listing(&["DB10", "DB11", "DB2261B"])),
        ),
        (
            "http://shop.test/directory/DB10/",
            MockResponse::ok(detail_page("White")).with_delay(Duration::from_millis(60)),
        ),
        (
            "http://shop.test/directory/DB11/",
            MockResponse::ok(detail_page("Black")).with_delay(Duration::from_millis(30)),
        ),
        (
            "http://shop.test/directory/DB2261B/",
            MockResponse::ok(detail_page("Red")),
        ),
    ]);

    let mut site = SiteConfig::miyuki_directory().unwrap();
    site.allowed_domains = vec!["shop.test".to_string()];
    site.start_urls = vec![Url::parse("http://shop.test/directory/").unwrap()];

    let dir = tempdir().unwrap();
    let path = dir.path().join("beads.json");
    let sink = StreamingJsonSink::create(&path).unwrap();
    let spider = BeadSpider::new(site, Box::new(sink))
        .unwrap()
        .with_known_codes(["DB-0011".to_string()].into_iter().collect());

    let spider = Crawler::new(Box::new(scraper.clone()))
        .run(spider)
        .await
        .unwrap();

    assert_eq!(spider.stats().duplicates_skipped, 1);
    assert_eq!(scraper.fetch_count("http://shop.test/directory/DB11/"), 0);

    let items = read_array(&path);
    assert_eq!(items.len(), 2);
    for item in &items {
        let expected = match item["product_code"].as_str().unwrap() {
            "DB-0010" => "White",
            "DB-2261-B" => "Red",
            other => panic!("unexpected code {other}"),
        };
        assert_eq!(item["color"], expected);
        assert_eq!(item["finish"], Value::Null);
        assert_eq!(item["size"], "11/0");
    }
}

struct StoppingSpider {
    config: SpiderConfig,
    parsed: usize,
    closed: Vec<String>,
}

#[async_trait]
impl Spider for StoppingSpider {
    fn name(&self) -> String {
        "stopping".to_string()
    }

    fn start_requests(&self) -> Vec<HttpRequest> {
        vec![HttpRequest::new(
            Url::parse("http://shop.test/a").unwrap(),
            SpiderCallback::Bootstrap,
            0,
        )]
    }

    fn config(&self) -> &SpiderConfig {
        &self.config
    }

    async fn parse(&mut self, _response: SpiderResponse) -> ScraperResult<ParseResult> {
        self.parsed += 1;
        Ok(ParseResult::Stop)
    }

    async fn close(&mut self, reason: &str) -> ScraperResult<()> {
        self.closed.push(reason.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn stop_still_closes_exactly_once() {
    let scraper = MockScraper::new(vec![("http://shop.test/a", MockResponse::ok("<html></html>"))]);
    let spider = StoppingSpider {
        config: SpiderConfig::default(),
        parsed: 0,
        closed: Vec::new(),
    };

    let spider = Crawler::new(Box::new(scraper)).run(spider).await.unwrap();
    assert_eq!(spider.parsed, 1);
    assert_eq!(spider.closed, vec!["stopped".to_string()]);
}

#[tokio::test]
async fn empty_crawl_still_closes() {
    let scraper = MockScraper::new(Vec::new());
    let spider = StoppingSpider {
        config: SpiderConfig::default().with_depth(0),
        parsed: 0,
        closed: Vec::new(),
    };

    let spider = Crawler::new(Box::new(scraper)).run(spider).await.unwrap();
    assert_eq!(spider.parsed, 0);
    assert_eq!(spider.closed, vec!["finished".to_string()]);
}
