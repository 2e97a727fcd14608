use log::debug;
use std::collections::HashSet;
use url::Url;

use super::{BeadRecord, PartialBead, RecordStage};
use crate::extract::{CodeExtractor, SizeTable};
use crate::parser::ListingTile;

/// What became of one listing tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    Record(RecordStage),
    NoLink,
    NoCode { name: String },
    Duplicate { code: String },
}

/// Turns raw listing tiles into records for one site profile.
#[derive(Debug, Clone)]
pub struct ProductRecordBuilder {
    brand: String,
    bead_type: String,
    extractor: CodeExtractor,
    sizes: SizeTable,
    name_noise: Vec<String>,
    follow_detail: bool,
    known_codes: HashSet<String>,
    skip_known: bool,
}

impl ProductRecordBuilder {
    pub fn new(brand: &str, bead_type: &str, extractor: CodeExtractor, sizes: SizeTable) -> Self {
        Self {
            brand: brand.to_string(),
            bead_type: bead_type.to_string(),
            extractor,
            sizes,
            name_noise: Vec::new(),
            follow_detail: false,
            known_codes: HashSet::new(),
            skip_known: false,
        }
    }

    /// Literal fragments removed from every tile name before extraction.
    pub fn with_name_noise(mut self, noise: Vec<String>) -> Self {
        self.name_noise = noise;
        self
    }

    /// Records come out as `RecordStage::Partial` and wait for their detail page.
    pub fn with_detail_pages(mut self, follow: bool) -> Self {
        self.follow_detail = follow;
        self
    }

    /// Codes already stored downstream. Only consulted when `skip` is set.
    pub fn with_known_codes(mut self, codes: HashSet<String>, skip: bool) -> Self {
        self.known_codes = codes;
        self.skip_known = skip;
        self
    }

    pub fn clean_name(&self, raw: &str) -> String {
        let mut name = raw.trim().to_string();
        for noise in &self.name_noise {
            name = name.replace(noise.as_str(), "");
        }
        name.trim().to_string()
    }

    /// `base` is the URL of the listing page the tile came from.
    pub fn build(&self, tile: &ListingTile, base: &Url) -> TileOutcome {
        let Some(link) = tile.link.as_deref() else {
            return TileOutcome::NoLink;
        };
        let source_url = match base.join(link) {
            Ok(url) => url,
            Err(e) => {
                debug!("Unresolvable product link {}: {}", link, e);
                return TileOutcome::NoLink;
            }
        };

        let name = self.clean_name(tile.name.as_deref().unwrap_or_default());
        let Some(code) = self.extractor.extract(&name) else {
            return TileOutcome::NoCode { name };
        };

        if self.skip_known && self.known_codes.contains(&code.canonical) {
            return TileOutcome::Duplicate {
                code: code.canonical,
            };
        }

        let image_url = tile
            .image
            .as_deref()
            .and_then(|src| base.join(src).ok())
            .map(String::from);

        let record = BeadRecord {
            name,
            size: self.sizes.lookup_prefix(&code.prefix).to_string(),
            product_code: code.canonical,
            brand: self.brand.clone(),
            bead_type: self.bead_type.clone(),
            image_url,
            source_url: source_url.into(),
            detail: None,
        };

        if self.follow_detail {
            TileOutcome::Record(RecordStage::Partial(PartialBead::new(record)))
        } else {
            TileOutcome::Record(RecordStage::Complete(record))
        }
    }
}
