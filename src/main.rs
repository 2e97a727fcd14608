use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;

use beadcrawl::config::{load_settings, OutputFormat, Settings, SiteConfig};
use beadcrawl::core::SpiderConfig;
use beadcrawl::import::{archive_with_timestamp, BeadTable, BulkUpsertImporter, PgBeadTable};
use beadcrawl::publish::{FeedPublisher, RemoteStore};
use beadcrawl::scrapers::HttpScraper;
use beadcrawl::storage::{FeedSink, RecordSink, StreamingJsonSink};
use beadcrawl::{BeadSpider, Crawler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("selectors", log::LevelFilter::Warn)
        .filter_module("html5ever", log::LevelFilter::Error)
        .filter_module("sqlx", log::LevelFilter::Warn)
        .init();

    let settings = load_settings().context("failed to load settings")?;
    let site = settings.site.clone();
    info!("Starting {} crawl", site.name);

    let table = match settings.database_url.as_deref() {
        Some(url) => match PgBeadTable::connect(url).await {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("Database unavailable before crawl: {}", e);
                None
            }
        },
        None => None,
    };

    let known_codes = if site.skip_known_codes {
        load_known_codes(table.as_ref(), settings.brand_id).await
    } else {
        HashSet::new()
    };

    let scraped_at = Utc::now();
    let sink = open_sink(&site)?;
    let spider = BeadSpider::new(site.clone(), sink)?
        .with_config(SpiderConfig::default().with_concurrency(settings.concurrency))
        .with_known_codes(known_codes);

    let scraper = HttpScraper::with_user_agent(&settings.user_agent)?;
    info!("Fetching with user agent {}", scraper.user_agent());
    let crawler = Crawler::new(Box::new(scraper));
    let spider = crawler.run(spider).await?;
    let output = spider.state().output_path().to_path_buf();

    if site.output == OutputFormat::Feed {
        upload_feed(&settings, &output, &site.name, scraped_at).await;
    }

    if let Some(url) = settings.database_url.as_deref() {
        let table = match table {
            Some(table) => table,
            None => PgBeadTable::connect(url)
                .await
                .context("failed to connect to database")?,
        };
        let importer = BulkUpsertImporter::new(table, settings.brand_id);
        let result = importer
            .import(&output)
            .await
            .with_context(|| format!("import of {} failed", output.display()))?;
        info!(
            "Import completed: {} imported, {} duplicates, {} in file",
            result.imported_count, result.duplicate_count, result.total_count
        );

        if settings.archive_after_import {
            if let Err(e) = archive_with_timestamp(&output) {
                warn!("Failed to archive {}: {}", output.display(), e);
            }
        }
    }

    Ok(())
}

fn open_sink(site: &SiteConfig) -> anyhow::Result<Box<dyn RecordSink>> {
    let sink: Box<dyn RecordSink> = match site.output {
        OutputFormat::StreamingArray => Box::new(
            StreamingJsonSink::create(&site.output_path)
                .with_context(|| format!("cannot open {}", site.output_path.display()))?,
        ),
        OutputFormat::Feed => Box::new(FeedSink::new(
            &site.output_path,
            &site.name,
            &site.source(),
        )),
    };
    Ok(sink)
}

async fn load_known_codes(table: Option<&PgBeadTable>, brand_id: i64) -> HashSet<String> {
    let Some(table) = table else {
        info!("No database configured - will scrape all products");
        return HashSet::new();
    };
    match table.existing_codes(brand_id).await {
        Ok(codes) => codes,
        Err(e) => {
            warn!("Could not load existing product codes: {}", e);
            info!("Continuing without duplicate checking");
            HashSet::new()
        }
    }
}

async fn upload_feed(settings: &Settings, output: &Path, spider: &str, scraped_at: DateTime<Utc>) {
    let Some(s3) = &settings.s3 else {
        warn!("S3 upload not configured - scraped data will only be saved locally");
        info!("To enable S3 upload, set AWS_S3_BUCKET, AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY");
        return;
    };
    match RemoteStore::s3(s3) {
        Ok(store) => {
            FeedPublisher::new(Box::new(store))
                .publish(output, spider, scraped_at)
                .await;
        }
        Err(e) => warn!("Could not create S3 client for bucket {}: {}", s3.bucket, e),
    }
}
