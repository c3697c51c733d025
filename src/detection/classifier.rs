//! Rule-based scam classifier.
//!
//! Each category owns a list of weighted regex rules. A message's score for
//! a category is the sum of the weights of every rule that matches its
//! lowercased text, capped at 1.0. The best-scoring category becomes the
//! candidate; categories are visited in table order and only a strictly
//! higher score replaces the candidate, so ties go to the earlier category.
//!
//! Category-agnostic risk indicators (urgency, odd salutations, requests
//! for action) can push a borderline message over [`SCAM_THRESHOLD`].

use regex::Regex;
use tracing::debug;

use crate::model::{ScamCategory, ScamVerdict};

/// Minimum score for a positive verdict.
pub const SCAM_THRESHOLD: f64 = 0.4;

/// Added to a sub-threshold score when any risk indicator fired.
pub const RISK_BOOST: f64 = 0.1;

/// Category reported when only the risk boost made the message positive.
pub const FALLBACK_CATEGORY: ScamCategory = ScamCategory::Phishing;

/// Absorbs float noise when comparing sums of decimal weights.
const SCORE_EPSILON: f64 = 1e-9;

/// A single weighted pattern.
#[derive(Debug, Clone)]
pub struct WeightedRule {
    /// Source pattern, kept for logging.
    pub pattern: String,
    regex: Regex,
    /// Contribution in `[0, 1]` when the pattern matches.
    pub weight: f64,
}

impl WeightedRule {
    /// Compile a rule.
    pub fn new(pattern: &str, weight: f64) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: pattern.to_string(),
            regex: Regex::new(pattern)?,
            weight: weight.clamp(0.0, 1.0),
        })
    }

    pub fn is_match(&self, lowered: &str) -> bool {
        self.regex.is_match(lowered)
    }
}

/// All rules for one category.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    pub category: ScamCategory,
    pub rules: Vec<WeightedRule>,
}

/// A category-agnostic warning sign.
#[derive(Debug, Clone)]
pub struct RiskIndicator {
    pub label: String,
    regex: Regex,
}

impl RiskIndicator {
    pub fn new(pattern: &str, label: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.to_string(),
            regex: Regex::new(pattern)?,
        })
    }
}

/// Deterministic rule-table classifier. Pure and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct ScamClassifier {
    categories: Vec<CategoryRules>,
    risk_indicators: Vec<RiskIndicator>,
}

impl ScamClassifier {
    /// Create a classifier with the built-in rule table.
    ///
    /// Table order (and therefore tie-break order): bank fraud, UPI fraud,
    /// phishing, fake offer, investment, tech support, romance.
    pub fn default_rules() -> Self {
        let table: [(ScamCategory, &[(&str, f64)]); 7] = [
            (
                ScamCategory::BankFraud,
                &[
                    (r"\b(account.*number|ac no)\b", 0.3),
                    (r"\b(password|pin|otp|cvv)\b", 0.4),
                    (r"\b(verify.*account|kyc|adhaar|aadhaar|pan card|unblock)\b", 0.3),
                    (r"\b(blocked|suspended|deactivated)\b", 0.2),
                ],
            ),
            (
                ScamCategory::UpiFraud,
                &[
                    (r"\b(paytm|gpay|phonepe|upi)\b", 0.2),
                    (r"\b(receive.*money|cashback|refund)\b", 0.3),
                    (r"\b(scan.*qr|qr.*code)\b", 0.4),
                    (r"\b(enter.*pin)\b", 0.5),
                ],
            ),
            (
                ScamCategory::Phishing,
                &[
                    (r"\b(click here|visit link|open this)\b", 0.3),
                    // Long, obfuscated links.
                    (r"https?://\S{15,}", 0.3),
                    (
                        r"\b(login|sign in|update.*payment|verify.*identity|account.*suspended)\b",
                        0.4,
                    ),
                    (r"\b(urgent|immediate.*|24 hours|expire.*now)\b", 0.2),
                ],
            ),
            (
                ScamCategory::FakeOffer,
                &[
                    (r"\b(winner|won|lottery|prize)\b", 0.5),
                    (r"\b(congratulations|lucky)\b", 0.3),
                    (r"\b(claim|redeem)\b", 0.3),
                    (r"\b(free|gift)\b", 0.2),
                ],
            ),
            (
                ScamCategory::InvestmentScam,
                &[
                    (r"\b(invest|crypto|bitcoin|profit|return)\b", 0.4),
                    (r"\b(guaranteed|double|earning)\b", 0.4),
                    (r"\b(opportunity|scheme)\b", 0.2),
                ],
            ),
            (
                ScamCategory::TechSupport,
                &[
                    (
                        r"\b(microsoft|apple|support|technician|virus|infected|malware|pc|computer)\b",
                        0.3,
                    ),
                    (r"\b(error.*code|scanning|alert|warning)\b", 0.3),
                    (r"\b(toll.*free|call.*now|\+?1-?8[0-9]{2})\b", 0.4),
                ],
            ),
            (
                ScamCategory::RomanceScam,
                &[
                    (r"\b(love|honey|babe|darling|dear)\b", 0.2),
                    (r"\b(lonely|widow|soldier|abroad|stuck)\b", 0.3),
                    (r"\b(need.*help|money.*flight|hospital.*bill)\b", 0.4),
                ],
            ),
        ];

        let categories = table
            .iter()
            .map(|(category, rules)| CategoryRules {
                category: *category,
                rules: rules
                    .iter()
                    .map(|(pattern, weight)| {
                        WeightedRule::new(pattern, *weight)
                            .expect("built-in classifier pattern must compile")
                    })
                    .collect(),
            })
            .collect();

        let risk_indicators = [
            (r"\b(urgent|hurry|immediate.*)\b", "Urgency"),
            (r"\b(kindly|dear|beloved)\b", "Suspicious Salutation"),
            (r"\b(verify|update|provide|submit)\b", "Action Request"),
        ]
        .iter()
        .map(|(pattern, label)| {
            RiskIndicator::new(pattern, label).expect("built-in risk pattern must compile")
        })
        .collect();

        Self {
            categories,
            risk_indicators,
        }
    }

    /// Create a classifier with no rules (for testing).
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
            risk_indicators: Vec::new(),
        }
    }

    /// Add a weighted rule to a category, appending the category to the
    /// end of the table if it is not present yet.
    pub fn add_rule(
        &mut self,
        category: ScamCategory,
        pattern: &str,
        weight: f64,
    ) -> Result<(), regex::Error> {
        let rule = WeightedRule::new(pattern, weight)?;
        match self.categories.iter_mut().find(|c| c.category == category) {
            Some(existing) => existing.rules.push(rule),
            None => self.categories.push(CategoryRules {
                category,
                rules: vec![rule],
            }),
        }
        Ok(())
    }

    /// Add a universal risk indicator.
    pub fn add_risk_indicator(&mut self, pattern: &str, label: &str) -> Result<(), regex::Error> {
        self.risk_indicators.push(RiskIndicator::new(pattern, label)?);
        Ok(())
    }

    /// Capped score per category, in table order.
    pub fn category_scores(&self, text: &str) -> Vec<(ScamCategory, f64)> {
        let lowered = text.to_lowercase();
        self.scores_lowered(&lowered)
    }

    fn scores_lowered(&self, lowered: &str) -> Vec<(ScamCategory, f64)> {
        self.categories
            .iter()
            .map(|c| {
                let sum: f64 = c
                    .rules
                    .iter()
                    .filter(|r| r.is_match(lowered))
                    .map(|r| r.weight)
                    .sum();
                (c.category, sum.min(1.0))
            })
            .collect()
    }

    /// Labels of the risk indicators that fire, in table order, without duplicates.
    fn risk_labels(&self, lowered: &str) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for indicator in &self.risk_indicators {
            if indicator.regex.is_match(lowered) && !labels.contains(&indicator.label) {
                labels.push(indicator.label.clone());
            }
        }
        labels
    }

    /// Classify a message.
    pub fn classify(&self, text: &str) -> ScamVerdict {
        if text.trim().is_empty() {
            return ScamVerdict::benign();
        }

        let lowered = text.to_lowercase();
        let risk_indicators = self.risk_labels(&lowered);

        let mut best = ScamCategory::Unknown;
        let mut score = 0.0_f64;
        for (category, category_score) in self.scores_lowered(&lowered) {
            if category_score > score {
                best = category;
                score = category_score;
            }
        }

        let mut is_scam = meets_threshold(score);
        if !is_scam && !risk_indicators.is_empty() {
            score += RISK_BOOST;
            if meets_threshold(score) {
                is_scam = true;
                if best == ScamCategory::Unknown {
                    best = FALLBACK_CATEGORY;
                }
            }
        }

        let confidence = round2(score.min(1.0));

        debug!(
            category = %best,
            confidence,
            is_scam,
            risk_indicators = ?risk_indicators,
            "Classified message"
        );

        if !is_scam {
            return ScamVerdict {
                confidence,
                risk_indicators,
                ..ScamVerdict::benign()
            };
        }

        let indicators = if risk_indicators.is_empty() {
            "specific keywords".to_string()
        } else {
            risk_indicators.join(", ")
        };

        ScamVerdict {
            is_scam: true,
            confidence,
            category: best,
            reasoning: format!(
                "Detected potential {best} with confidence {confidence:.2}. Indicators: {indicators}"
            ),
            risk_indicators,
        }
    }
}

impl Default for ScamClassifier {
    fn default() -> Self {
        Self::default_rules()
    }
}

fn meets_threshold(score: f64) -> bool {
    score + SCORE_EPSILON >= SCAM_THRESHOLD
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_lottery_offer() {
        let classifier = ScamClassifier::default_rules();
        let verdict = classifier
            .classify("Congratulations! You won ₹50,000! Send ₹500 to 9876543210@paytm to claim.");
        assert!(verdict.is_scam);
        assert_eq!(verdict.category, ScamCategory::FakeOffer);
        assert!(verdict.confidence >= SCAM_THRESHOLD);
        assert!(verdict.reasoning.contains("fake_offer"));
        assert!(verdict.reasoning.contains("1.00"));
    }

    #[test]
    fn greeting_is_benign() {
        let classifier = ScamClassifier::default_rules();
        let verdict = classifier.classify("Hello, how are you today?");
        assert!(!verdict.is_scam);
        assert_eq!(verdict.category, ScamCategory::Unknown);
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn empty_text_is_benign() {
        let classifier = ScamClassifier::default_rules();
        for text in ["", "   ", "\n\t"] {
            let verdict = classifier.classify(text);
            assert!(!verdict.is_scam);
            assert_eq!(verdict.confidence, 0.0);
        }
    }

    #[test]
    fn bank_fraud_with_otp_request() {
        let classifier = ScamClassifier::default_rules();
        let verdict = classifier
            .classify("Your account is blocked. Share the OTP to verify your account immediately.");
        assert!(verdict.is_scam);
        assert_eq!(verdict.category, ScamCategory::BankFraud);
        assert!(verdict.risk_indicators.contains(&"Urgency".to_string()));
        assert!(verdict.risk_indicators.contains(&"Action Request".to_string()));
    }

    #[test]
    fn category_score_is_capped() {
        let classifier = ScamClassifier::default_rules();
        let scores = classifier.category_scores("WINNER! Lucky prize, claim your free gift");
        let (_, fake_offer) = scores
            .iter()
            .find(|(c, _)| *c == ScamCategory::FakeOffer)
            .unwrap();
        assert_eq!(*fake_offer, 1.0);
    }

    #[test]
    fn risk_boost_pushes_borderline_over_threshold() {
        // "support" alone scores 0.3 for tech support; "kindly" adds the boost.
        let classifier = ScamClassifier::default_rules();
        let plain = classifier.classify("Contact support");
        assert!(!plain.is_scam);
        assert_eq!(plain.confidence, 0.3);

        let boosted = classifier.classify("Kindly contact support");
        assert!(boosted.is_scam);
        assert_eq!(boosted.category, ScamCategory::TechSupport);
        assert_eq!(boosted.confidence, 0.4);
        assert!(boosted.reasoning.contains("Suspicious Salutation"));
    }

    #[test]
    fn ties_resolve_to_earlier_category() {
        let mut classifier = ScamClassifier::empty();
        classifier
            .add_rule(ScamCategory::RomanceScam, r"\bshared\b", 0.5)
            .unwrap();
        classifier
            .add_rule(ScamCategory::BankFraud, r"\bshared\b", 0.5)
            .unwrap();
        let verdict = classifier.classify("a shared word");
        assert!(verdict.is_scam);
        assert_eq!(verdict.category, ScamCategory::RomanceScam);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = ScamClassifier::default_rules();
        let inputs = [
            "URGENT: your KYC is pending, click here http://secure-bank-login.example.com/verify",
            "Dear, I am a soldier stuck abroad and need help with a hospital bill",
            "Guaranteed double returns on bitcoin, invest now",
            "",
            "see you at lunch",
        ];
        for text in inputs {
            assert_eq!(classifier.classify(text), classifier.classify(text));
        }
    }

    #[test]
    fn custom_risk_indicator() {
        let mut classifier = ScamClassifier::empty();
        classifier
            .add_rule(ScamCategory::InvestmentScam, r"\bforex\b", 0.3)
            .unwrap();
        classifier
            .add_risk_indicator(r"\bact fast\b", "Pressure")
            .unwrap();
        let verdict = classifier.classify("Forex signals, act fast");
        assert!(verdict.is_scam);
        assert_eq!(verdict.risk_indicators, vec!["Pressure".to_string()]);
    }

    #[test]
    fn invalid_custom_rule_is_rejected() {
        let mut classifier = ScamClassifier::empty();
        assert!(
            classifier
                .add_rule(ScamCategory::Phishing, r"(unclosed", 0.3)
                .is_err()
        );
    }
}
