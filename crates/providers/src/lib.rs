//! LLM completion providers for DocBot.
//!
//! All providers implement the `docbot_core::Provider` trait.

pub mod yandex;

pub use yandex::YandexGptProvider;
