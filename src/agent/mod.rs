//! Persona agent: keeps a flagged scammer talking.
//!
//! Generation is optional. When no LLM is configured a scripted responder
//! stands in, and any generator failure just means no reply this turn.

pub mod generator;
pub mod persona;

pub use generator::{
    PersonaAgent, ResponseGenerator, ScriptedResponder, SessionContext, create_generator,
};
pub use persona::{Persona, PersonaKind};
