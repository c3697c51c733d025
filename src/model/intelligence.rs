//! Structured intelligence extracted from scam conversations.
//!
//! Every collection is deduplicated by its natural key: account number,
//! handle string, normalized phone digits, URL. [`Intelligence::merge`]
//! keeps that invariant across turns.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// A candidate bank account number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub account_number: String,
    /// Routing/sort code (IFSC) seen in the same message, if any.
    pub routing_code: Option<String>,
    pub confidence: f64,
}

/// A phone number, normalized (no whitespace or hyphens).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub number: String,
    pub country_code: String,
    pub confidence: f64,
}

/// A link found in message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    /// Authority component of the URL.
    pub domain: String,
    /// Set by later enrichment; extraction always leaves it false.
    pub is_malicious: bool,
}

/// Matched behavioral keywords, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPatterns {
    pub urgency: BTreeSet<String>,
    pub financial: BTreeSet<String>,
    pub coercion: BTreeSet<String>,
}

impl BehaviorPatterns {
    fn merge(&mut self, other: BehaviorPatterns) {
        self.urgency.extend(other.urgency);
        self.financial.extend(other.financial);
        self.coercion.extend(other.coercion);
    }

    pub fn is_empty(&self) -> bool {
        self.urgency.is_empty() && self.financial.is_empty() && self.coercion.is_empty()
    }
}

/// Everything extracted from one message, or accumulated over a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intelligence {
    pub bank_accounts: Vec<BankAccount>,
    pub payment_handles: BTreeSet<String>,
    pub phone_numbers: Vec<PhoneNumber>,
    pub links: Vec<Link>,
    pub keywords: BTreeSet<String>,
    pub behavior: BehaviorPatterns,
}

impl Intelligence {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.bank_accounts.is_empty()
            && self.payment_handles.is_empty()
            && self.phone_numbers.is_empty()
            && self.links.is_empty()
            && self.keywords.is_empty()
            && self.behavior.is_empty()
    }

    /// Number of actionable entities (accounts, handles, phones, links).
    pub fn entity_count(&self) -> usize {
        self.bank_accounts.len()
            + self.payment_handles.len()
            + self.phone_numbers.len()
            + self.links.len()
    }

    /// Fold `other` into `self`, unioning every field by natural key.
    ///
    /// Entries already present win over incoming duplicates, so merging the
    /// same intelligence twice leaves `self` unchanged.
    pub fn merge(&mut self, other: Intelligence) {
        let known: HashSet<String> = self
            .bank_accounts
            .iter()
            .map(|a| a.account_number.clone())
            .collect();
        push_new(&mut self.bank_accounts, other.bank_accounts, known, |a| {
            a.account_number.clone()
        });

        let known: HashSet<String> = self.phone_numbers.iter().map(|p| p.number.clone()).collect();
        push_new(&mut self.phone_numbers, other.phone_numbers, known, |p| {
            p.number.clone()
        });

        let known: HashSet<String> = self.links.iter().map(|l| l.url.clone()).collect();
        push_new(&mut self.links, other.links, known, |l| l.url.clone());

        self.payment_handles.extend(other.payment_handles);
        self.keywords.extend(other.keywords);
        self.behavior.merge(other.behavior);
    }
}

/// Append items whose key is not yet in `known`, tracking keys as they go in.
fn push_new<T, F>(target: &mut Vec<T>, incoming: Vec<T>, mut known: HashSet<String>, key: F)
where
    F: Fn(&T) -> String,
{
    for item in incoming {
        if known.insert(key(&item)) {
            target.push(item);
        }
    }
}
