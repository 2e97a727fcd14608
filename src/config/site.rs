use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use super::ConfigError;
use crate::extract::{CodeExtractor, CodeFormat, CodePattern, SizeTable};
use crate::items::DetailField;
use crate::parser::{DetailSelector, FieldSelector, ListingSelectors};
use crate::ScraperResult;

const DELICA_FAMILIES: [&str; 4] = ["DBS", "DBM", "DBL", "DB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Records streamed into a bare JSON array as they are finalized.
    StreamingArray,
    /// A `{metadata, beads}` document written once at close.
    Feed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePatternConfig {
    pub prefix: String,
    pub pattern: String,
}

/// Everything that differs between catalog sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub bead_type: String,
    pub allowed_domains: Vec<String>,
    pub start_urls: Vec<Url>,
    pub selectors: ListingSelectors,
    /// Empty when the site's listing tiles are already complete.
    #[serde(default)]
    pub detail_selectors: Vec<DetailSelector>,
    pub code_patterns: Vec<CodePatternConfig>,
    pub code_format: CodeFormat,
    pub sizes: SizeTable,
    #[serde(default)]
    pub name_noise: Vec<String>,
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default)]
    pub skip_known_codes: bool,
    pub output: OutputFormat,
    pub output_path: PathBuf,
}

impl SiteConfig {
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let site = match name {
            "miyuki_directory" => Self::miyuki_directory()?,
            "fire_mountain_gems" => Self::fire_mountain_gems()?,
            other => return Err(ConfigError::UnknownSite(other.to_string())),
        };
        Ok(site)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::SiteFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::SiteParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn follows_detail_pages(&self) -> bool {
        !self.detail_selectors.is_empty()
    }

    pub fn extractor(&self) -> ScraperResult<CodeExtractor> {
        let patterns = self
            .code_patterns
            .iter()
            .map(|p| CodePattern::new(&p.prefix, &p.pattern))
            .collect::<ScraperResult<Vec<_>>>()?;
        Ok(CodeExtractor::new(patterns, self.code_format))
    }

    /// Start URL recorded as the feed's `source`.
    pub fn source(&self) -> String {
        self.start_urls
            .first()
            .map(Url::to_string)
            .unwrap_or_else(|| self.name.clone())
    }

    /// WooCommerce product directory. Tiles link to detail pages that carry
    /// the attribute table; codes are zero-padded (`DB-0010`).
    pub fn miyuki_directory() -> ScraperResult<Self> {
        let detail_selectors = DetailField::ALL
            .iter()
            .map(|&field| -> ScraperResult<DetailSelector> {
                Ok(DetailSelector {
                    field,
                    selector: FieldSelector::parse(&format!(
                        "tr.woocommerce-product-attributes-item--attribute_pa_{} \
                         td.woocommerce-product-attributes-item__value p::text",
                        field.woocommerce_slug()
                    ))?,
                })
            })
            .collect::<ScraperResult<Vec<_>>>()?;

        Ok(Self {
            name: "miyuki_directory".to_string(),
            brand: "Miyuki".to_string(),
            bead_type: "Delica".to_string(),
            allowed_domains: vec!["miyuki-beads.co.jp".to_string()],
            start_urls: vec![Url::parse("https://www.miyuki-beads.co.jp/directory/")?],
            selectors: ListingSelectors {
                tile: FieldSelector::parse(".product")?,
                link: FieldSelector::parse(".woocommerce-LoopProduct-link::attr(href)")?,
                name: FieldSelector::parse("h2.woocommerce-loop-product__title::text")?,
                image: FieldSelector::parse("img.attachment-woocommerce_thumbnail::attr(src)")?,
                next_page: FieldSelector::parse("a.next::attr(href)")?,
            },
            detail_selectors,
            code_patterns: delica_patterns(r"{p}-?(\d+)(?:-?([A-Z])\b)?"),
            code_format: CodeFormat::Padded { width: 4 },
            sizes: delica_sizes(),
            name_noise: vec!["\nProduct Title".to_string()],
            max_pages: None,
            skip_known_codes: true,
            output: OutputFormat::StreamingArray,
            output_path: PathBuf::from("data/beads.json"),
        })
    }

    /// Fire Mountain Gems brand listing. Tiles are complete on their own.
    pub fn fire_mountain_gems() -> ScraperResult<Self> {
        Ok(Self {
            name: "fire_mountain_gems".to_string(),
            brand: "Miyuki".to_string(),
            bead_type: "Delica".to_string(),
            allowed_domains: vec!["firemountaingems.com".to_string()],
            start_urls: vec![Url::parse(
                "https://www.firemountaingems.com/beads/beads-by-brand/miyuki/",
            )?],
            selectors: ListingSelectors {
                tile: FieldSelector::parse(".product-tile")?,
                link: FieldSelector::parse(".link::attr(href)")?,
                name: FieldSelector::parse("h3.name::text")?,
                image: FieldSelector::parse("img.tile-image::attr(src)")?,
                next_page: FieldSelector::parse("a.page-link-next::attr(href)")?,
            },
            detail_selectors: Vec::new(),
            code_patterns: delica_patterns(r"{p}-?(\d+)"),
            code_format: CodeFormat::Compact,
            sizes: delica_sizes(),
            name_noise: vec!["\nProduct Title".to_string()],
            max_pages: None,
            skip_known_codes: false,
            output: OutputFormat::Feed,
            output_path: PathBuf::from("beads.json"),
        })
    }
}

fn delica_patterns(template: &str) -> Vec<CodePatternConfig> {
    DELICA_FAMILIES
        .iter()
        .map(|prefix| CodePatternConfig {
            prefix: prefix.to_string(),
            pattern: template.replace("{p}", prefix),
        })
        .collect()
}

fn delica_sizes() -> SizeTable {
    SizeTable::new(vec![
        ("DBS-", "15/0"),
        ("DB-", "11/0"),
        ("DBM-", "10/0"),
        ("DBL-", "8/0"),
    ])
}
