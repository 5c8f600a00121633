// src/services/mod.rs
//
// Pluggable external services: sign-in providers and coupon image extraction

pub mod identity;
pub mod ocr;
pub mod openai;

// Re-export commonly used types for convenience
pub use identity::{DemoIdentityProvider, EmailIdentityProvider, Identity, IdentityProvider};
pub use ocr::{ExtractedCoupon, MockOcr, OcrProvider, OcrRegistry};
pub use openai::{OpenAIConfig, OpenAIVisionOcr};
