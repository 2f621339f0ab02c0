use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::entity::Entity;
use crate::entity::Visibility;
use crate::form::FormField;
use crate::form::FormPayload;
use crate::form::ImageUpload;
use crate::ids::EntityId;
use crate::ids::UserId;

/// A user-curated grouping of stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: EntityId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: Visibility,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub story_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Theme {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThemeDraft {
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub cover_image: Option<ImageUpload>,
}

impl FormPayload for ThemeDraft {
    fn form_fields(&self) -> Vec<FormField> {
        let mut fields = vec![
            FormField::text("name", self.name.clone()),
            FormField::boolean("isPublic", self.visibility.is_public()),
        ];
        if let Some(description) = &self.description {
            fields.push(FormField::text("description", description.clone()));
        }
        if let Some(cover) = &self.cover_image {
            fields.push(FormField::image("coverImage", cover.clone()));
        }
        fields
    }
}
