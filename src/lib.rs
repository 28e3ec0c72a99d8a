//! Funnel Bot — a scripted sales funnel for chat.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod funnel;
