use posterforge_common::Item;

use crate::ratings::RatingService;

/// Decides whether an item is worth processing.
///
/// An item qualifies when the media server marked it eligible and it either
/// already carries a rating or some rating platform could supply one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityFilter {
    providers_configured: bool,
}

impl EligibilityFilter {
    pub fn new(providers_configured: bool) -> Self {
        Self {
            providers_configured,
        }
    }

    /// Providers count as configured when at least one has a platform.
    pub fn from_services(services: &[RatingService]) -> Self {
        Self::new(services.iter().any(|s| s.platform.is_some()))
    }

    pub fn is_eligible(&self, item: &Item) -> bool {
        item.is_eligible && (!item.ratings.is_empty() || self.providers_configured)
    }
}
