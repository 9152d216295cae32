use crate::model::BaselineNav;

/// Position among question steps only (consent steps excluded), 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionPosition {
    pub index: usize,
    pub total: usize,
}

impl QuestionPosition {
    #[must_use]
    pub fn from_nav(nav: &BaselineNav) -> Self {
        Self {
            index: nav.index.saturating_sub(nav.leading_consent_steps),
            total: nav.total.saturating_sub(nav.leading_consent_steps),
        }
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.total > 0 && self.index + 1 >= self.total
    }
}
