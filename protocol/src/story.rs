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

/// A quote taken from a book, published by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: EntityId,
    pub owner_id: UserId,
    #[serde(default)]
    pub owner_nickname: Option<String>,
    pub title: String,
    pub quote: String,
    pub book_title: String,
    #[serde(default)]
    pub book_author: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub theme_id: Option<EntityId>,
    pub visibility: Visibility,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Story {
    pub fn has_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.keywords
            .iter()
            .any(|candidate| candidate.to_lowercase().contains(&needle))
    }
}

impl Entity for Story {
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

/// Fields a user fills in when writing or editing a story.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoryDraft {
    pub title: String,
    pub quote: String,
    pub book_title: String,
    pub book_author: Option<String>,
    pub keywords: Vec<String>,
    pub theme_id: Option<EntityId>,
    pub visibility: Visibility,
    pub image: Option<ImageUpload>,
}

impl FormPayload for StoryDraft {
    fn form_fields(&self) -> Vec<FormField> {
        let mut fields = vec![
            FormField::text("title", self.title.clone()),
            FormField::text("quote", self.quote.clone()),
            FormField::text("bookTitle", self.book_title.clone()),
            FormField::boolean("isPublic", self.visibility.is_public()),
            FormField::list("keywords", self.keywords.clone()),
        ];
        if let Some(author) = &self.book_author {
            fields.push(FormField::text("bookAuthor", author.clone()));
        }
        if let Some(theme_id) = &self.theme_id {
            fields.push(FormField::text("themeId", theme_id.as_str()));
        }
        if let Some(image) = &self.image {
            fields.push(FormField::image("image", image.clone()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormValue;
    use pretty_assertions::assert_eq;

    fn sample() -> Story {
        Story {
            id: EntityId::new("s-1"),
            owner_id: UserId::new("u-1"),
            owner_nickname: None,
            title: "On patience".to_string(),
            quote: "It does not do to dwell on dreams.".to_string(),
            book_title: "The Philosopher's Stone".to_string(),
            book_author: None,
            keywords: vec!["Patience".to_string(), "dreams".to_string()],
            theme_id: None,
            visibility: Visibility::Public,
            image_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let story = sample();
        assert!(story.has_keyword("patience"));
        assert!(story.has_keyword("DREAM"));
        assert!(!story.has_keyword("courage"));
        assert!(!story.has_keyword("   "));
    }

    #[test]
    fn decodes_camel_case_payload() {
        let raw = r#"{
            "id": "s-9",
            "ownerId": "u-2",
            "title": "t",
            "quote": "q",
            "bookTitle": "b",
            "visibility": "private",
            "updatedAt": "2024-05-01T10:00:00Z"
        }"#;
        let story: Story = serde_json::from_str(raw).expect("decode story");
        assert_eq!(story.visibility, Visibility::Private);
        assert_eq!(story.keywords, Vec::<String>::new());
        assert!(story.updated_at.is_some());
    }

    #[test]
    fn draft_omits_absent_optional_fields() {
        let draft = StoryDraft {
            title: "t".to_string(),
            quote: "q".to_string(),
            book_title: "b".to_string(),
            visibility: Visibility::Private,
            ..Default::default()
        };
        let fields = draft.form_fields();
        let names: Vec<_> = fields.iter().map(|field| field.name).collect();
        assert_eq!(
            names,
            vec!["title", "quote", "bookTitle", "isPublic", "keywords"]
        );
        assert_eq!(fields[3].value, FormValue::Boolean(false));
    }
}
