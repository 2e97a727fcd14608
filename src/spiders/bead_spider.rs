use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::HashSet;
use url::Url;

use super::CrawlState;
use crate::config::SiteConfig;
use crate::core::{ParseResult, SpiderCallback, SpiderConfig, SpiderResponse};
use crate::http::HttpResponse;
use crate::items::{PartialBead, ProductRecordBuilder, RecordStage, TileOutcome};
use crate::parser::{parse_detail, parse_listing};
use crate::stats::CrawlStats;
use crate::storage::RecordSink;
use crate::{HttpRequest, ScraperResult, Spider};

/// Catalog spider driven entirely by a [`SiteConfig`].
pub struct BeadSpider {
    site: SiteConfig,
    builder: ProductRecordBuilder,
    config: SpiderConfig,
    state: CrawlState,
}

impl BeadSpider {
    pub fn new(site: SiteConfig, sink: Box<dyn RecordSink>) -> ScraperResult<Self> {
        let builder = ProductRecordBuilder::new(
            &site.brand,
            &site.bead_type,
            site.extractor()?,
            site.sizes.clone(),
        )
        .with_name_noise(site.name_noise.clone())
        .with_detail_pages(site.follows_detail_pages());

        let config = SpiderConfig::default().with_allowed_domains(site.allowed_domains.clone());
        let state = CrawlState::new(sink, site.max_pages);

        Ok(Self {
            site,
            builder,
            config,
            state,
        })
    }

    pub fn with_config(mut self, config: SpiderConfig) -> Self {
        self.config = config.with_allowed_domains(self.site.allowed_domains.clone());
        self
    }

    /// Codes already stored downstream; skipped only if the site asks for it.
    pub fn with_known_codes(mut self, codes: HashSet<String>) -> Self {
        if self.site.skip_known_codes {
            info!("Loaded {} existing product codes", codes.len());
        }
        self.builder = self
            .builder
            .with_known_codes(codes, self.site.skip_known_codes);
        self
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.state.stats
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    fn parse_listing_page(&mut self, response: &HttpResponse) -> ParseResult {
        let page = parse_listing(&response.body, &self.site.selectors);
        info!(
            "Parsing page: {} ({} products)",
            response.url,
            page.tiles.len()
        );

        let depth = response.from_request.depth + 1;
        let mut requests = Vec::new();

        for tile in &page.tiles {
            match self.builder.build(tile, &response.url) {
                TileOutcome::Record(RecordStage::Complete(record)) => self.state.finalize(record),
                TileOutcome::Record(RecordStage::Partial(partial)) => {
                    if let Some(request) = detail_request(partial, depth) {
                        requests.push(request);
                    }
                }
                TileOutcome::NoLink => {
                    self.state.stats.missing_links += 1;
                    debug!("Skipping tile without product link on {}", response.url);
                }
                TileOutcome::NoCode { name } => {
                    self.state.stats.unmatched_skipped += 1;
                    debug!("Skipping non-delicas: {}", name);
                }
                TileOutcome::Duplicate { code } => {
                    self.state.stats.duplicates_skipped += 1;
                    debug!("Skipping duplicate product: {}", code);
                }
            }
        }

        if let Some(next) = self
            .state
            .paginator
            .on_page(page.next_href.as_deref(), &response.url)
        {
            requests.push(HttpRequest::new(next, SpiderCallback::ParsePagination, depth));
        }

        ParseResult::Continue(requests)
    }

    fn parse_detail_page(&mut self, partial: PartialBead, response: &HttpResponse) -> ParseResult {
        let detail = parse_detail(&response.body, &self.site.detail_selectors);
        let record = partial.complete(detail);
        debug!(
            "Detailed bead {}: color={:?}, finish={:?}",
            record.product_code,
            record.detail.as_ref().and_then(|d| d.color.as_deref()),
            record.detail.as_ref().and_then(|d| d.finish.as_deref()),
        );
        self.state.finalize(record);
        ParseResult::Skip
    }
}

fn detail_request(partial: PartialBead, depth: usize) -> Option<HttpRequest> {
    match Url::parse(&partial.record().source_url) {
        Ok(url) => Some(HttpRequest::new(
            url,
            SpiderCallback::ParseDetail(Box::new(partial)),
            depth,
        )),
        Err(e) => {
            warn!(
                "Dropping {}: bad detail URL {}: {}",
                partial.record().product_code,
                partial.record().source_url,
                e
            );
            None
        }
    }
}

#[async_trait]
impl Spider for BeadSpider {
    fn name(&self) -> String {
        self.site.name.clone()
    }

    fn start_requests(&self) -> Vec<HttpRequest> {
        self.site
            .start_urls
            .iter()
            .map(|url| HttpRequest::new(url.clone(), SpiderCallback::Bootstrap, 0))
            .collect()
    }

    fn config(&self) -> &SpiderConfig {
        &self.config
    }

    async fn parse(&mut self, response: SpiderResponse) -> ScraperResult<ParseResult> {
        let SpiderResponse { response, callback } = response;
        let result = match callback {
            SpiderCallback::Bootstrap | SpiderCallback::ParsePagination => {
                self.parse_listing_page(&response)
            }
            SpiderCallback::ParseDetail(partial) => self.parse_detail_page(*partial, &response),
        };
        Ok(result)
    }

    async fn close(&mut self, reason: &str) -> ScraperResult<()> {
        let name = self.name();
        self.state.close(&name)?;
        info!("Spider closed with reason: {}", reason);
        Ok(())
    }
}
