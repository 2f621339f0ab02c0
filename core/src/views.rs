//! Filters over the story and theme sets.
//!
//! A view knows two things: which endpoint serves its pages, and whether a
//! given snapshot belongs to it. The second is what lets a collection react
//! to writes made elsewhere without asking the server.

use quotebook_backend_client::Endpoint;
use quotebook_backend_client::RemoteEntity;
use quotebook_backend_client::endpoints;
use quotebook_protocol::EntityId;
use quotebook_protocol::Story;
use quotebook_protocol::Theme;
use quotebook_protocol::UserId;
use std::fmt;

pub trait CollectionView<E: RemoteEntity>: fmt::Display + Send + Sync + 'static {
    /// Endpoint for the 1-based `page`.
    fn page_endpoint(&self, page: u32, page_size: u32) -> Endpoint;

    /// Membership predicate used when reconciling change events.
    fn contains(&self, entity: &E) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryView {
    /// Everything the user wrote, private stories included.
    Mine(UserId),
    Public,
    /// Another user's public stories.
    Author(UserId),
    /// Public stories with a keyword containing the text, ignoring case.
    Keyword(String),
    Theme(EntityId),
}

impl CollectionView<Story> for StoryView {
    fn page_endpoint(&self, page: u32, page_size: u32) -> Endpoint {
        let endpoint = match self {
            StoryView::Mine(_) => endpoints::stories::mine(),
            StoryView::Public => endpoints::stories::public(),
            StoryView::Author(author) => endpoints::stories::by_author(author),
            StoryView::Keyword(keyword) => endpoints::stories::search(keyword),
            StoryView::Theme(theme) => endpoints::stories::in_theme(theme),
        };
        endpoint.with_page(page, page_size)
    }

    fn contains(&self, story: &Story) -> bool {
        match self {
            StoryView::Mine(user) => &story.owner_id == user,
            StoryView::Public => story.visibility.is_public(),
            StoryView::Author(author) => {
                &story.owner_id == author && story.visibility.is_public()
            }
            StoryView::Keyword(keyword) => {
                story.visibility.is_public() && story.has_keyword(keyword)
            }
            StoryView::Theme(theme) => story.theme_id.as_ref() == Some(theme),
        }
    }
}

impl fmt::Display for StoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryView::Mine(user) => write!(f, "stories of {user} (own)"),
            StoryView::Public => f.write_str("public stories"),
            StoryView::Author(user) => write!(f, "public stories of {user}"),
            StoryView::Keyword(keyword) => write!(f, "stories matching `{keyword}`"),
            StoryView::Theme(theme) => write!(f, "stories in theme {theme}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeView {
    Mine(UserId),
    Public,
    Author(UserId),
}

impl CollectionView<Theme> for ThemeView {
    fn page_endpoint(&self, page: u32, page_size: u32) -> Endpoint {
        let endpoint = match self {
            ThemeView::Mine(_) => endpoints::themes::mine(),
            ThemeView::Public => endpoints::themes::public(),
            ThemeView::Author(author) => endpoints::themes::by_author(author),
        };
        endpoint.with_page(page, page_size)
    }

    fn contains(&self, theme: &Theme) -> bool {
        match self {
            ThemeView::Mine(user) => &theme.owner_id == user,
            ThemeView::Public => theme.visibility.is_public(),
            ThemeView::Author(author) => {
                &theme.owner_id == author && theme.visibility.is_public()
            }
        }
    }
}

impl fmt::Display for ThemeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeView::Mine(user) => write!(f, "themes of {user} (own)"),
            ThemeView::Public => f.write_str("public themes"),
            ThemeView::Author(user) => write!(f, "public themes of {user}"),
        }
    }
}
