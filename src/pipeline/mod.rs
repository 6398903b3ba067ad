//! Pipeline stages for one upload cycle.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets the controller swap the transport
//! (e.g. an in-process endpoint in tests) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! selection ──▶ request ──▶ transfer ──▶ finalize ──▶ render
//! (.ebc check)  (multipart)  (POST /)    (80 → 100%)  (cards)
//! ```
//!
//! 1. [`selection`] — check names and read file contents; the only stage that
//!    may refuse a cycle before anything is sent
//! 2. [`request`]   — assemble the `files` / `encoding` / `dest_encoding` form
//! 3. [`transfer`]  — send it, reporting byte progress scaled into `0..=80`;
//!    the only stage with network I/O
//! 4. [`finalize`]  — cosmetic 1-point-per-tick walk to 100 after the reply
//! 5. [`render`]    — turn outcomes into text or HTML result cards

pub mod finalize;
pub mod render;
pub mod request;
pub mod selection;
pub mod transfer;
