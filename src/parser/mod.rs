pub mod html;
pub mod selector;

pub use html::{
    parse_detail, parse_listing, DetailSelector, ListingPage, ListingSelectors, ListingTile,
};
pub use selector::FieldSelector;
