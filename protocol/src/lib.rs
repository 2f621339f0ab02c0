//! Wire-level types shared by the quotebook client crates.
//!
//! Nothing in here performs I/O: these are the value snapshots the server
//! hands out ([`Story`], [`Theme`]), the write payloads the client sends
//! ([`StoryDraft`], [`ThemeDraft`] via [`FormField`]), the JSON envelope every
//! endpoint wraps its payload in, and the [`ChangeEvent`] vocabulary used to
//! keep in-memory collections consistent after a write.

mod auth;
mod entity;
mod envelope;
mod event;
mod form;
mod ids;
mod story;
mod theme;

pub use auth::AccountSummary;
pub use auth::RefreshRequest;
pub use auth::SignInRequest;
pub use auth::SignInResponse;
pub use auth::TokenPair;
pub use auth::TokenRefreshResponse;
pub use entity::Entity;
pub use entity::Visibility;
pub use envelope::ApiEnvelope;
pub use envelope::Page;
pub use envelope::Pagination;
pub use event::ChangeEvent;
pub use form::FormField;
pub use form::FormPayload;
pub use form::FormValue;
pub use form::ImageFormat;
pub use form::ImageUpload;
pub use ids::EntityId;
pub use ids::UserId;
pub use story::Story;
pub use story::StoryDraft;
pub use theme::Theme;
pub use theme::ThemeDraft;
