//! Pattern-based entity extraction.
//!
//! Pulls payment handles, phone numbers, bank accounts, links and
//! behavioral keywords out of free text. Extraction never fails; text with
//! nothing interesting yields an empty [`Intelligence`].

use std::collections::{BTreeSet, HashSet};

use regex::Regex;
use tracing::debug;

use crate::config::{ExtractorConfig, PhoneLocale};
use crate::model::{BankAccount, BehaviorPatterns, Intelligence, Link, PhoneNumber};

const URGENCY_WORDS: &[&str] = &["urgent", "immediately", "hurry", "asap", "24 hours"];
const FINANCIAL_WORDS: &[&str] = &["invest", "profit", "return", "bank", "account", "money"];
const COERCION_WORDS: &[&str] = &["police", "arrest", "cbi", "customs", "blocked"];

/// E-mail providers whose addresses are never payment handles.
const PUBLIC_EMAIL_PROVIDERS: &[&str] = &[
    "gmail",
    "yahoo",
    "hotmail",
    "outlook",
    "live",
    "icloud",
    "protonmail",
    "rediffmail",
    "aol",
];

const PHONE_CONFIDENCE: f64 = 0.9;
const ACCOUNT_CONFIDENCE: f64 = 0.5;
const ACCOUNT_WITH_ROUTING_CONFIDENCE: f64 = 0.8;

/// Characters stripped from the end of a matched URL or handle.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// Compiled extraction patterns for one phone locale.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    locale: PhoneLocale,
    handle: Regex,
    phone: Regex,
    account: Regex,
    routing_code: Regex,
    link: Regex,
}

impl EntityExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        let phone = match config.phone_locale {
            PhoneLocale::India => r"(?:\+91[\-\s]?|\b91[\-\s]?|\b)[6-9]\d{9}\b",
            PhoneLocale::NorthAmerica => {
                r"(?:\+1[\-\s.]?)?(?:\([2-9]\d{2}\)\s?|\b[2-9]\d{2}[\-\s.]?)[2-9]\d{2}[\-\s.]?\d{4}\b"
            }
        };

        Self {
            locale: config.phone_locale,
            handle: compile(r"[\w.\-]+@[\w.\-]+"),
            phone: compile(phone),
            account: compile(r"\b\d{9,18}\b"),
            routing_code: compile(r"\b[A-Z]{4}0[A-Z0-9]{6}\b"),
            link: compile(r#"https?://[^\s<>"']+"#),
        }
    }

    /// Extract everything recognizable from `text`.
    pub fn extract(&self, text: &str) -> Intelligence {
        let mut intel = Intelligence::default();
        if text.trim().is_empty() {
            return intel;
        }

        intel.payment_handles = self.payment_handles(text).into_iter().collect();
        intel.phone_numbers = self.phone_numbers(text);
        intel.bank_accounts = self.bank_accounts(text);
        intel.links = self.links(text);

        let (keywords, behavior) = keywords(text);
        intel.keywords = keywords;
        intel.behavior = behavior;

        debug!(
            accounts = intel.bank_accounts.len(),
            handles = intel.payment_handles.len(),
            phones = intel.phone_numbers.len(),
            links = intel.links.len(),
            keywords = intel.keywords.len(),
            "Extracted intelligence"
        );

        intel
    }

    fn payment_handles(&self, text: &str) -> Vec<String> {
        self.handle
            .find_iter(text)
            .filter_map(|m| {
                let handle = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
                let (local, domain) = handle.split_once('@')?;
                if local.is_empty() || domain.is_empty() || is_public_email(domain) {
                    return None;
                }
                Some(handle.to_string())
            })
            .collect()
    }

    fn phone_numbers(&self, text: &str) -> Vec<PhoneNumber> {
        let mut seen = HashSet::new();
        self.phone
            .find_iter(text)
            .filter_map(|m| {
                let number: String = m
                    .as_str()
                    .chars()
                    .filter(|c| !matches!(c, ' ' | '\t' | '-' | '.' | '(' | ')'))
                    .collect();
                seen.insert(number.clone()).then(|| PhoneNumber {
                    number,
                    country_code: self.locale.country_code().to_string(),
                    confidence: PHONE_CONFIDENCE,
                })
            })
            .collect()
    }

    fn bank_accounts(&self, text: &str) -> Vec<BankAccount> {
        let routing_code = self
            .routing_code
            .find(text)
            .map(|m| m.as_str().to_string());
        let confidence = if routing_code.is_some() {
            ACCOUNT_WITH_ROUTING_CONFIDENCE
        } else {
            ACCOUNT_CONFIDENCE
        };

        let mut seen = HashSet::new();
        self.account
            .find_iter(text)
            .filter(|m| !text[..m.start()].ends_with('+'))
            .map(|m| m.as_str())
            .filter(|digits| !self.looks_like_national_phone(digits))
            .filter_map(|digits| {
                seen.insert(digits.to_string()).then(|| BankAccount {
                    account_number: digits.to_string(),
                    routing_code: routing_code.clone(),
                    confidence,
                })
            })
            .collect()
    }

    /// A bare ten-digit run with a subscriber-number leading digit.
    fn looks_like_national_phone(&self, digits: &str) -> bool {
        let leading = match self.locale {
            PhoneLocale::India => '6'..='9',
            PhoneLocale::NorthAmerica => '2'..='9',
        };
        digits.len() == 10 && digits.chars().next().is_some_and(|c| leading.contains(&c))
    }

    fn links(&self, text: &str) -> Vec<Link> {
        let mut seen = HashSet::new();
        self.link
            .find_iter(text)
            .filter_map(|m| {
                let url = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
                let domain = authority(url)?;
                seen.insert(url.to_string()).then(|| Link {
                    url: url.to_string(),
                    domain,
                    is_malicious: false,
                })
            })
            .collect()
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in extraction pattern must compile")
}

fn is_public_email(domain: &str) -> bool {
    let provider = domain
        .split('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    PUBLIC_EMAIL_PROVIDERS.contains(&provider.as_str())
}

/// Authority component of an http(s) URL, lowercased. `None` when empty.
fn authority(url: &str) -> Option<String> {
    let rest = url.split_once("://")?.1;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let domain = &rest[..end];
    (!domain.is_empty()).then(|| domain.to_ascii_lowercase())
}

fn keywords(text: &str) -> (BTreeSet<String>, BehaviorPatterns) {
    let lowered = text.to_lowercase();
    let matched = |words: &[&str]| {
        words
            .iter()
            .filter(|w| lowered.contains(*w))
            .map(|w| w.to_string())
            .collect::<BTreeSet<String>>()
    };

    let behavior = BehaviorPatterns {
        urgency: matched(URGENCY_WORDS),
        financial: matched(FINANCIAL_WORDS),
        coercion: matched(COERCION_WORDS),
    };

    let all = behavior
        .urgency
        .iter()
        .chain(&behavior.financial)
        .chain(&behavior.coercion)
        .cloned()
        .collect();

    (all, behavior)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::default()
    }

    #[test]
    fn lottery_message_yields_one_handle() {
        let intel = extractor()
            .extract("Congratulations! You won ₹50,000! Send ₹500 to 9876543210@paytm to claim.");
        assert_eq!(intel.payment_handles.len(), 1);
        assert!(intel.payment_handles.contains("9876543210@paytm"));
        assert!(intel.bank_accounts.is_empty());
    }

    #[test]
    fn trailing_dot_is_trimmed_from_handle() {
        let intel = extractor().extract("Pay to scammer@okaxis.");
        assert!(intel.payment_handles.contains("scammer@okaxis"));
    }

    #[test]
    fn public_email_is_not_a_handle() {
        let intel = extractor().extract("Mail me at someone@gmail.com or other@Yahoo.co.in");
        assert!(intel.payment_handles.is_empty());
    }

    #[test]
    fn phones_are_normalized_and_deduplicated() {
        let intel = extractor().extract("Call +91-9876543210 or +91 98765 43210? Also +91-9876543210.");
        let numbers: Vec<&str> = intel
            .phone_numbers
            .iter()
            .map(|p| p.number.as_str())
            .collect();
        assert_eq!(numbers, vec!["+919876543210"]);
        assert_eq!(intel.phone_numbers[0].country_code, "+91");
        assert_eq!(intel.phone_numbers[0].confidence, 0.9);
    }

    #[test]
    fn non_mobile_digits_are_not_phones() {
        let intel = extractor().extract("Reference 1234567890 today");
        assert!(intel.phone_numbers.is_empty());
        // Ten digits not starting 6-9 count as an account candidate.
        assert_eq!(intel.bank_accounts.len(), 1);
    }

    #[test]
    fn account_with_routing_code() {
        let intel =
            extractor().extract("Transfer to A/C 123456789012 IFSC SBIN0001234 and 99887766554433");
        assert_eq!(intel.bank_accounts.len(), 2);
        for account in &intel.bank_accounts {
            assert_eq!(account.routing_code.as_deref(), Some("SBIN0001234"));
            assert_eq!(account.confidence, 0.8);
        }
    }

    #[test]
    fn account_without_routing_code() {
        let intel = extractor().extract("account 123456789012");
        assert_eq!(intel.bank_accounts.len(), 1);
        assert_eq!(intel.bank_accounts[0].routing_code, None);
        assert_eq!(intel.bank_accounts[0].confidence, 0.5);
    }

    #[test]
    fn international_phone_is_not_an_account() {
        let intel = extractor().extract("whatsapp +919876543210");
        assert!(intel.bank_accounts.is_empty());
        assert_eq!(intel.phone_numbers.len(), 1);
    }

    #[test]
    fn mobile_number_is_not_an_account() {
        let intel = extractor().extract("call 9876543210");
        assert!(intel.bank_accounts.is_empty());
    }

    #[test]
    fn links_trim_punctuation_and_record_domain() {
        let intel = extractor().extract(
            "Verify at https://Secure-Login.example.com:8443/kyc?id=1. Or (http://bit.ly/abc).",
        );
        assert_eq!(intel.links.len(), 2);
        assert_eq!(
            intel.links[0].url,
            "https://Secure-Login.example.com:8443/kyc?id=1"
        );
        assert_eq!(intel.links[0].domain, "secure-login.example.com:8443");
        assert_eq!(intel.links[1].url, "http://bit.ly/abc");
        assert_eq!(intel.links[1].domain, "bit.ly");
        assert!(intel.links.iter().all(|l| !l.is_malicious));
    }

    #[test]
    fn keywords_and_behavior() {
        let intel = extractor()
            .extract("URGENT: your bank account is blocked, police will arrest you in 24 hours");
        assert!(intel.behavior.urgency.contains("urgent"));
        assert!(intel.behavior.urgency.contains("24 hours"));
        assert!(intel.behavior.financial.contains("bank"));
        assert!(intel.behavior.financial.contains("account"));
        assert!(intel.behavior.coercion.contains("police"));
        assert!(intel.behavior.coercion.contains("arrest"));
        assert!(intel.behavior.coercion.contains("blocked"));
        assert_eq!(intel.keywords.len(), 7);
    }

    #[test]
    fn extraction_is_total() {
        let inputs = [
            "",
            "   ",
            "@@@",
            "http://",
            "+",
            "🙂🙂🙂",
            "a@",
            "@b",
            "999999999999999999999999999999",
        ];
        for text in inputs {
            let intel = extractor().extract(text);
            let mut accounts: Vec<_> = intel
                .bank_accounts
                .iter()
                .map(|a| a.account_number.clone())
                .collect();
            let before = accounts.len();
            accounts.dedup();
            assert_eq!(before, accounts.len());
        }
        assert!(extractor().extract("").is_empty());
    }

    #[test]
    fn north_american_locale() {
        let extractor = EntityExtractor::new(&ExtractorConfig {
            phone_locale: PhoneLocale::NorthAmerica,
        });
        let intel = extractor.extract("Call Microsoft support at +1 (415) 555-2671 or 415.555.2671");
        let numbers: Vec<&str> = intel
            .phone_numbers
            .iter()
            .map(|p| p.number.as_str())
            .collect();
        assert_eq!(numbers, vec!["+14155552671", "4155552671"]);
        assert!(intel.phone_numbers.iter().all(|p| p.country_code == "+1"));
        assert!(intel.bank_accounts.is_empty());
    }
}
