//! Telegram bot that turns chat commands into Imagen images and Veo videos.

/// Telegram dispatching and transport
pub mod bot;
/// Configuration and settings management
pub mod config;
/// Uploads of generated media and temp-file cleanup
pub mod delivery;
/// Image flow and video job poller
pub mod generation;
/// Generative media API client
pub mod media;
/// User-facing message texts
pub mod messages;
/// Utility functions
pub mod utils;
