//! Client-side logic
//!
//! The pieces of the chat UI that are pure logic rather than painting:
//! grouping streamed message parts into display blocks, the onboarding
//! questionnaire flow, and the local profile holding the generated user
//! id and questionnaire state.

pub mod profile;
pub mod questionnaire;
pub mod renderer;

pub use profile::{Profile, ProfileStore};
pub use questionnaire::{Questionnaire, Screen};
pub use renderer::{render_message, DisplayBlock, RenderedMessage, StreamStatus};
