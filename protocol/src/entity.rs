use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ids::EntityId;
use crate::ids::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// An immutable snapshot of a server-side resource.
///
/// Collections are keyed by [`Entity::id`]; membership predicates usually
/// look at [`Entity::owner_id`] and [`Entity::visibility`].
pub trait Entity: Clone + Send + Sync + DeserializeOwned + 'static {
    fn id(&self) -> &EntityId;

    fn owner_id(&self) -> &UserId;

    fn visibility(&self) -> Visibility;

    /// Last modification time as reported by the server, if any.
    fn updated_at(&self) -> Option<DateTime<Utc>>;

    /// True when `self` is known to be older than `other`.
    fn is_older_than(&self, other: &Self) -> bool {
        match (self.updated_at(), other.updated_at()) {
            (Some(mine), Some(theirs)) => mine < theirs,
            _ => false,
        }
    }
}
