//! Client-side data layer for quotebook.
//!
//! A [`Session`] hands out [`CollectionController`]s over stories and themes.
//! Controllers of the same session share a [`ChangeBus`], so a write made
//! through one of them shows up in every other loaded view it belongs to.

pub mod bus;
pub mod collection;
pub mod config;
pub mod membership;
mod session;
pub mod views;

pub use bus::ChangeBus;
pub use bus::CollectionId;
pub use collection::CollectionController;
pub use collection::CollectionState;
pub use collection::LoadOutcome;
pub use config::Config;
pub use config::ConfigOverrides;
pub use session::Session;
pub use session::SessionError;
pub use views::CollectionView;
pub use views::StoryView;
pub use views::ThemeView;
