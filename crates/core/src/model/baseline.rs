use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineStatus {
    NotStarted,
    InProgress,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Raw step cursor reported by the service, consent steps included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BaselineNav {
    pub index: usize,
    pub total: usize,
    #[serde(default)]
    pub can_next: bool,
    #[serde(default)]
    pub can_submit: bool,
    /// Number of consent steps that precede the first question.
    #[serde(default)]
    pub leading_consent_steps: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineOption {
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BaselineStep {
    /// Acknowledgement only.
    Consent {
        id: String,
        #[serde(default)]
        text: String,
    },
    /// Single-choice question.
    Question {
        id: String,
        text: String,
        #[serde(default)]
        options: Vec<BaselineOption>,
        #[serde(default)]
        selected: Option<usize>,
    },
    /// Terminal: the server lost answers and the assessment must be reset.
    ReviewMissing {
        #[serde(default)]
        message: Option<String>,
    },
}

impl BaselineStep {
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            BaselineStep::Consent { id, .. } | BaselineStep::Question { id, .. } => Some(id),
            BaselineStep::ReviewMissing { .. } => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BaselineStep::Consent { .. } => "consent",
            BaselineStep::Question { .. } => "question",
            BaselineStep::ReviewMissing { .. } => "review_missing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSession {
    pub status: BaselineStatus,
    #[serde(default)]
    pub nav: BaselineNav,
    #[serde(default)]
    pub step: Option<BaselineStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_steps() {
        let raw = r#"{
            "status": "in_progress",
            "nav": { "index": 1, "total": 4, "can_next": true, "leading_consent_steps": 1 },
            "step": {
                "type": "question",
                "id": "q1",
                "text": "How often?",
                "options": [{ "index": 0, "label": "Never" }, { "index": 1, "label": "Daily" }]
            }
        }"#;
        let session: BaselineSession = serde_json::from_str(raw).unwrap();
        let step = session.step.unwrap();
        assert_eq!(step.kind(), "question");
        assert_eq!(step.id(), Some("q1"));
        assert_eq!(session.nav.leading_consent_steps, 1);
    }

    #[test]
    fn review_missing_has_no_id() {
        let step: BaselineStep = serde_json::from_str(r#"{ "type": "review_missing" }"#).unwrap();
        assert_eq!(step.id(), None);
        assert_eq!(step.kind(), "review_missing");
    }
}
