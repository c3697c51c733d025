//! Victim personas the honeypot plays.

use crate::model::ScamCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaKind {
    ElderlyVictim,
    NaiveStudent,
    CuriousSkeptic,
}

/// A character sketch used to build the LLM system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub kind: PersonaKind,
    pub traits: &'static [&'static str],
    pub background: &'static str,
    pub style: &'static str,
}

const PERSONAS: [Persona; 3] = [
    Persona {
        kind: PersonaKind::ElderlyVictim,
        traits: &["trusting", "technologically illiterate", "polite", "confused"],
        background: "72-year-old retired school teacher living alone.",
        style: "Uses formal language, types slowly, asks for clarification often.",
    },
    Persona {
        kind: PersonaKind::NaiveStudent,
        traits: &["eager", "broke", "optimistic", "careless"],
        background: "20-year-old college student looking for quick cash.",
        style: "Uses slang, emojis, replies fast, very interested in money.",
    },
    Persona {
        kind: PersonaKind::CuriousSkeptic,
        traits: &["cautious", "detail-oriented", "slow", "methodical"],
        background: "45-year-old accountant who verifies everything.",
        style: "Asks specific questions, references rules or policies.",
    },
];

impl Persona {
    /// Pick the persona for a conversation.
    ///
    /// Tech-support scams get the elderly victim and investment scams the
    /// student. Anything else gets a persona derived from the session id,
    /// so the character never changes mid-conversation.
    pub fn for_conversation(category: ScamCategory, session_id: &str) -> &'static Persona {
        match category {
            ScamCategory::TechSupport => &PERSONAS[0],
            ScamCategory::InvestmentScam => &PERSONAS[1],
            _ => &PERSONAS[(stable_hash(session_id) % PERSONAS.len() as u64) as usize],
        }
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            PersonaKind::ElderlyVictim => "elderly_victim",
            PersonaKind::NaiveStudent => "naive_student",
            PersonaKind::CuriousSkeptic => "curious_skeptic",
        }
    }

    /// System prompt for the LLM.
    pub fn system_prompt(&self, language: Option<&str>) -> String {
        let mut prompt = format!(
            "You are a {}. Personality: {}. Style: {} \
             You are chatting with someone who might be a scammer. \
             Your goal is to waste their time and keep them talking without revealing you know it's a scam. \
             Do NOT give away real personal sensitive info (use fake info). \
             Act confused often. Ask for clarifications. \
             Keep replies short, one or two sentences, like a text message.",
            self.background.trim_end_matches('.'),
            self.traits.join(", "),
            self.style,
        );
        if let Some(language) = language.filter(|l| !l.trim().is_empty()) {
            prompt.push_str(&format!(" Reply in the language with code '{language}'."));
        }
        prompt
    }
}

/// FNV-1a; stable across builds and platforms.
fn stable_hash(value: &str) -> u64 {
    value.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}
