//! In-memory stand-ins for the quotebook backend used by the core tests.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration as ChronoDuration;
use chrono::TimeZone;
use chrono::Utc;
use parking_lot::Mutex;
use quotebook_backend_client::ApiError;
use quotebook_backend_client::Endpoint;
use quotebook_backend_client::EntityGateway;
use quotebook_core::CollectionState;
use quotebook_protocol::EntityId;
use quotebook_protocol::Page;
use quotebook_protocol::Pagination;
use quotebook_protocol::Story;
use quotebook_protocol::StoryDraft;
use quotebook_protocol::UserId;
use quotebook_protocol::Visibility;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::sync::watch;

pub const ME: &str = "me";

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn story(id: &str, owner: &str, visibility: Visibility) -> Story {
    Story {
        id: EntityId::new(id),
        owner_id: UserId::new(owner),
        owner_nickname: None,
        title: format!("story {id}"),
        quote: "So we beat on, boats against the current.".to_string(),
        book_title: "The Great Gatsby".to_string(),
        book_author: Some("F. Scott Fitzgerald".to_string()),
        keywords: vec!["dream".to_string()],
        theme_id: None,
        visibility,
        image_url: None,
        created_at: Some(base_time()),
        updated_at: Some(base_time()),
    }
}

/// `count` public stories owned by someone else, ids `s-00`, `s-01`, ...
pub fn public_stories(count: usize) -> Vec<Story> {
    (0..count)
        .map(|index| story(&format!("s-{index:02}"), "other", Visibility::Public))
        .collect()
}

/// Serves stories from a vector and records every call.
///
/// `stories/public` lists public stories, `stories/me` lists stories owned
/// by [`ME`], anything else lists everything.
#[derive(Default)]
pub struct FakeStoryGateway {
    stories: Mutex<Vec<Story>>,
    page_fetches: AtomicUsize,
    clock: AtomicI64,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    failure: Mutex<Option<ApiError>>,
}

impl FakeStoryGateway {
    pub fn with_stories(stories: Vec<Story>) -> Self {
        let gateway = Self::default();
        *gateway.stories.lock() = stories;
        gateway
    }

    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    /// Holds the next page fetch until the returned sender fires or drops.
    pub fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.gate.lock() = Some(gate);
        release
    }

    pub fn fail_next_fetch(&self, error: ApiError) {
        *self.failure.lock() = Some(error);
    }

    fn tick(&self) -> DateTime<Utc> {
        let seconds = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        base_time() + ChronoDuration::seconds(seconds)
    }

    fn apply_draft(&self, story: &mut Story, draft: &StoryDraft) {
        story.title = draft.title.clone();
        story.quote = draft.quote.clone();
        story.book_title = draft.book_title.clone();
        story.book_author = draft.book_author.clone();
        story.keywords = draft.keywords.clone();
        story.theme_id = draft.theme_id.clone();
        story.visibility = draft.visibility;
        story.updated_at = Some(self.tick());
    }
}

fn query_value(endpoint: &Endpoint, key: &str) -> Option<u32> {
    endpoint
        .query()
        .iter()
        .find(|(name, _)| *name == key)
        .and_then(|(_, value)| value.parse().ok())
}

#[async_trait]
impl EntityGateway<Story> for FakeStoryGateway {
    async fn fetch_page(&self, endpoint: &Endpoint) -> Result<Page<Story>, ApiError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let failure = self.failure.lock().take();
        if let Some(error) = failure {
            return Err(error);
        }

        let page = query_value(endpoint, "page").unwrap_or(1).max(1);
        let page_size = query_value(endpoint, "pageSize").unwrap_or(10).max(1);
        let matching: Vec<Story> = self
            .stories
            .lock()
            .iter()
            .filter(|story| match endpoint.path() {
                "stories/public" => story.visibility.is_public(),
                "stories/me" => story.owner_id.as_str() == ME,
                _ => true,
            })
            .cloned()
            .collect();

        let total_items = matching.len();
        let total_pages = total_items.div_ceil(page_size as usize).max(1) as u32;
        let items = matching
            .into_iter()
            .skip((page as usize - 1) * page_size as usize)
            .take(page_size as usize)
            .collect();
        Ok(Page {
            items,
            pagination: Pagination {
                current_page: page,
                total_pages,
                page_size,
                total_items: total_items as u64,
            },
        })
    }

    async fn fetch_one(&self, id: &EntityId) -> Result<Story, ApiError> {
        self.stories
            .lock()
            .iter()
            .find(|story| &story.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Server {
                status: 404,
                message: "story not found".to_string(),
            })
    }

    async fn create(&self, draft: &StoryDraft) -> Result<Story, ApiError> {
        let mut stories = self.stories.lock();
        let mut created = story(&format!("new-{}", stories.len()), ME, draft.visibility);
        self.apply_draft(&mut created, draft);
        stories.insert(0, created.clone());
        Ok(created)
    }

    async fn update(&self, id: &EntityId, draft: &StoryDraft) -> Result<Story, ApiError> {
        let mut stories = self.stories.lock();
        let Some(story) = stories.iter_mut().find(|story| &story.id == id) else {
            return Err(ApiError::Server {
                status: 404,
                message: "story not found".to_string(),
            });
        };
        self.apply_draft(story, draft);
        Ok(story.clone())
    }

    async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        self.stories.lock().retain(|story| &story.id != id);
        Ok(())
    }
}

pub fn draft_from(story: &Story) -> StoryDraft {
    StoryDraft {
        title: story.title.clone(),
        quote: story.quote.clone(),
        book_title: story.book_title.clone(),
        book_author: story.book_author.clone(),
        keywords: story.keywords.clone(),
        theme_id: story.theme_id.clone(),
        visibility: story.visibility,
        image: None,
    }
}

/// Waits until the watched state satisfies `predicate`, failing after two
/// seconds.
pub async fn wait_for_state<F>(
    receiver: &mut watch::Receiver<CollectionState<Story>>,
    predicate: F,
) -> CollectionState<Story>
where
    F: FnMut(&CollectionState<Story>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), receiver.wait_for(predicate))
        .await
        .expect("timed out waiting for collection state")
        .expect("collection state channel closed")
        .clone()
}

pub fn ids(items: &[Story]) -> Vec<String> {
    items.iter().map(|story| story.id.to_string()).collect()
}
