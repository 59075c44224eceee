//! Input screening for code submitted to the gateway.

pub mod injection;

pub use injection::{detect_prompt_injection, Detection};
