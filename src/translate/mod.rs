//! Translation between the canonical chat shape and the upstream formats.
//!
//! The browser speaks one shape (`{messages:[{role, content}]}` in,
//! `{choices:[{message:{content}}]}` out) regardless of the upstream. All
//! functions here are pure (no I/O).

pub mod gemini_types;
pub mod openai_types;
pub mod request;
pub mod response;
pub mod types;
