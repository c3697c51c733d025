//! Per-message classifier verdicts.

use serde::{Deserialize, Serialize};

/// Scam categories known to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScamCategory {
    BankFraud,
    UpiFraud,
    Phishing,
    FakeOffer,
    InvestmentScam,
    TechSupport,
    RomanceScam,
    Unknown,
}

impl ScamCategory {
    /// Stable snake_case label, matching the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BankFraud => "bank_fraud",
            Self::UpiFraud => "upi_fraud",
            Self::Phishing => "phishing",
            Self::FakeOffer => "fake_offer",
            Self::InvestmentScam => "investment_scam",
            Self::TechSupport => "tech_support",
            Self::RomanceScam => "romance_scam",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ScamCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifier decision for one message. Appended to session history, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamVerdict {
    pub is_scam: bool,
    /// Score in `[0, 1]`, rounded to two decimals.
    pub confidence: f64,
    pub category: ScamCategory,
    pub reasoning: String,
    /// Labels of the universal risk indicators that fired, without duplicates.
    pub risk_indicators: Vec<String>,
}

impl ScamVerdict {
    /// Negative verdict with zero confidence.
    pub fn benign() -> Self {
        Self {
            is_scam: false,
            confidence: 0.0,
            category: ScamCategory::Unknown,
            reasoning: "No significant scam patterns detected.".to_string(),
            risk_indicators: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_as_label() {
        for category in [
            ScamCategory::BankFraud,
            ScamCategory::FakeOffer,
            ScamCategory::TechSupport,
            ScamCategory::Unknown,
        ] {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, category.label());
        }
    }

    #[test]
    fn benign_verdict_is_negative() {
        let v = ScamVerdict::benign();
        assert!(!v.is_scam);
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.category, ScamCategory::Unknown);
    }
}
