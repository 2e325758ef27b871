//! # renshu-algo - practice scheduling algorithms
//!
//! Pure Rust algorithms behind the renshu practice coach:
//!
//! - **Weak-first selection** - mandatory weak items plus weighted sampling
//! - **Sprint pacing** - linear expectation toward a long-horizon target
//! - **Sanitization** - floors, ceilings and score normalization
//!
//! ## Module layout
//!
//! - [`selector`] - session selection over any [`selector::Weighted`] pool
//! - [`pacing`] - sprint pacer (expected level, day gap, completion)
//! - [`sanitize`] - numeric guards
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use renshu_algo::{select_session, session_rng, SelectorOptions};
//!
//! let weights: Vec<u32> = vec![9, 1, 1, 1, 1, 1, 1, 1, 1, 1];
//! let mut rng = session_rng(Some(7));
//! let selection = select_session(&weights, 10, &SelectorOptions::default(), &mut rng);
//! assert!(selection.mandatory.contains(&0));
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod pacing;
pub mod sanitize;
pub mod selector;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use pacing::{expected_difficulty, pace};

pub use selector::{select_flat, select_session, session_rng, Weighted};

/// Concrete RNG used for session selection
pub use rand_chacha::ChaCha8Rng as SessionRng;
