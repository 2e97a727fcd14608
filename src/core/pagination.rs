use log::{debug, info};
use url::Url;

/// Decides whether a listing page's "next" link is followed.
///
/// The page counter is bumped once per processed listing page, and the cap is
/// checked before the next link is even resolved: with `max_pages = Some(n)`
/// at most `n - 1` follow requests are issued. One paginator serves the whole
/// crawl, so the cap is shared by every start URL.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    max_pages: Option<usize>,
    pages_visited: usize,
}

impl Paginator {
    pub fn new(max_pages: Option<usize>) -> Self {
        Self {
            max_pages,
            pages_visited: 0,
        }
    }

    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    pub fn pages_visited(&self) -> usize {
        self.pages_visited
    }

    pub fn limit_reached(&self) -> bool {
        self.max_pages
            .is_some_and(|max| self.pages_visited >= max)
    }

    /// Records one processed listing page and returns the URL to follow, if any.
    pub fn on_page(&mut self, next_href: Option<&str>, base: &Url) -> Option<Url> {
        self.pages_visited += 1;

        if self.limit_reached() {
            info!(
                "Reached max pages limit ({}), stopping pagination",
                self.max_pages.unwrap_or_default()
            );
            return None;
        }

        let href = next_href?;
        match base.join(href) {
            Ok(next) => {
                info!("Following next page: {}", next);
                Some(next)
            }
            Err(e) => {
                debug!("Ignoring unparsable next link {:?}: {}", href, e);
                None
            }
        }
    }
}
