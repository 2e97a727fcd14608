use log::trace;
use scraper::Html;
use serde::{Deserialize, Serialize};

use super::FieldSelector;
use crate::items::{DetailAttributes, DetailField};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSelectors {
    pub tile: FieldSelector,
    pub link: FieldSelector,
    pub name: FieldSelector,
    pub image: FieldSelector,
    pub next_page: FieldSelector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailSelector {
    pub field: DetailField,
    pub selector: FieldSelector,
}

/// Raw strings pulled out of one product tile; nothing is validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingTile {
    pub link: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub tiles: Vec<ListingTile>,
    pub next_href: Option<String>,
}

pub fn parse_listing(body: &str, selectors: &ListingSelectors) -> ListingPage {
    let document = Html::parse_document(body);
    let root = document.root_element();

    let tiles = selectors
        .tile
        .elements(root)
        .map(|tile| ListingTile {
            link: selectors.link.first(tile),
            name: selectors.name.first(tile),
            image: selectors.image.first(tile),
        })
        .collect::<Vec<_>>();
    trace!("Extracted {} tiles", tiles.len());

    ListingPage {
        tiles,
        next_href: selectors.next_page.first(root),
    }
}

/// Applies every `(field, selector)` row uniformly; fields whose row is
/// missing on the page stay `None`.
pub fn parse_detail(body: &str, selectors: &[DetailSelector]) -> DetailAttributes {
    let document = Html::parse_document(body);
    let mut detail = DetailAttributes::default();
    for row in selectors {
        detail.set(row.field, row.selector.first_in(&document));
    }
    detail
}
