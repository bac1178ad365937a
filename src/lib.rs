//! Anonymous messaging relay for Telegram.
//!
//! Users hand out personal deep links. Anyone who follows one can send
//! text or media that arrives with the sender hidden, and replying to a
//! delivered copy routes back through the same pipe.

pub mod config;
pub mod relay;
