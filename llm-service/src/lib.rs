//! Shared LLM service for the lampe pipelines.
//!
//! Provides non-streaming chat clients for OpenAI and Anthropic with
//! function-calling support, a unified error type, and model tier
//! selection by review depth.
//!
//! Dispatch is enum-based (no `async-trait`, no `Box<dyn ...>`): the
//! [`LlmClient`] enum wraps one concrete service per vendor and exposes a
//! single `chat(messages, tools) -> ChatOutcome` surface to callers.

pub mod chat;
pub mod client;
pub mod config;
pub mod errors;
pub mod services;
pub mod tiers;

pub use chat::{ChatMessage, ChatOutcome, Role, ToolCallRequest, ToolDefinition};
pub use client::LlmClient;
pub use config::{LlmModelConfig, LlmProvider};
pub use errors::{LlmError, LlmResult};
pub use tiers::{ModelTier, resolve_tier_config};
