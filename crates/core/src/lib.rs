//! # Solace Core
//!
//! Domain types, collaborator traits, and error definitions for the Solace
//! context-assembly subsystem. This crate has **zero framework dependencies**;
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (memory store, consent store, profile and
//! message sources, feedback writer) is defined as a trait here.
//! Implementations live in their respective crates. This enables:
//! - Swapping storage engines via configuration
//! - Easy testing with in-memory implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod consent;
pub mod error;
pub mod feedback;
pub mod memory;
pub mod mood;
pub mod profile;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use consent::{ConsentCategory, ConsentSettings, ConsentStore, SessionConsent};
pub use error::{ConsentError, Error, Result, StoreError};
pub use feedback::{FeedbackInput, FeedbackTag, FeedbackWriter};
pub use memory::{CleanupReport, MemoryItem, MemoryPatch, MemoryQuery, MemoryStore, MemoryType, NewMemory};
pub use mood::{Goal, GoalStatus, Intensity, JournalEntry, JournalTone, Mood, MoodEntry};
pub use profile::{
    ConversationMood, MessageSource, ProfileSource, RecentMessage, TonePreference, UserProfile,
};
