//! Per-entity access to the REST resources behind a collection.

use async_trait::async_trait;
use quotebook_protocol::Entity;
use quotebook_protocol::EntityId;
use quotebook_protocol::FormPayload;
use quotebook_protocol::Page;
use quotebook_protocol::Story;
use quotebook_protocol::StoryDraft;
use quotebook_protocol::Theme;
use quotebook_protocol::ThemeDraft;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::body::RequestBody;
use crate::endpoint::Endpoint;
use crate::endpoints;
use crate::error::ApiError;
use crate::executor::RequestExecutor;

/// An entity with a conventional single-item REST resource.
pub trait RemoteEntity: Entity {
    type Draft: FormPayload + Send + Sync + 'static;

    fn detail_endpoint(id: &EntityId) -> Endpoint;

    fn create_endpoint() -> Endpoint;

    fn update_endpoint(id: &EntityId) -> Endpoint;

    fn delete_endpoint(id: &EntityId) -> Endpoint;
}

impl RemoteEntity for Story {
    type Draft = StoryDraft;

    fn detail_endpoint(id: &EntityId) -> Endpoint {
        endpoints::stories::detail(id)
    }

    fn create_endpoint() -> Endpoint {
        endpoints::stories::create()
    }

    fn update_endpoint(id: &EntityId) -> Endpoint {
        endpoints::stories::update(id)
    }

    fn delete_endpoint(id: &EntityId) -> Endpoint {
        endpoints::stories::delete(id)
    }
}

impl RemoteEntity for Theme {
    type Draft = ThemeDraft;

    fn detail_endpoint(id: &EntityId) -> Endpoint {
        endpoints::themes::detail(id)
    }

    fn create_endpoint() -> Endpoint {
        endpoints::themes::create()
    }

    fn update_endpoint(id: &EntityId) -> Endpoint {
        endpoints::themes::update(id)
    }

    fn delete_endpoint(id: &EntityId) -> Endpoint {
        endpoints::themes::delete(id)
    }
}

/// The operations a collection controller needs from the backend.
#[async_trait]
pub trait EntityGateway<E: RemoteEntity>: Send + Sync {
    async fn fetch_page(&self, endpoint: &Endpoint) -> Result<Page<E>, ApiError>;

    async fn fetch_one(&self, id: &EntityId) -> Result<E, ApiError>;

    async fn create(&self, draft: &E::Draft) -> Result<E, ApiError>;

    async fn update(&self, id: &EntityId, draft: &E::Draft) -> Result<E, ApiError>;

    async fn delete(&self, id: &EntityId) -> Result<(), ApiError>;
}

pub struct HttpGateway<E> {
    executor: Arc<RequestExecutor>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> HttpGateway<E> {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for HttpGateway<E> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.executor))
    }
}

#[async_trait]
impl<E: RemoteEntity> EntityGateway<E> for HttpGateway<E> {
    async fn fetch_page(&self, endpoint: &Endpoint) -> Result<Page<E>, ApiError> {
        self.executor.execute_page(endpoint).await
    }

    async fn fetch_one(&self, id: &EntityId) -> Result<E, ApiError> {
        self.executor
            .execute_data(&E::detail_endpoint(id), &RequestBody::Empty)
            .await
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, ApiError> {
        self.executor
            .execute_data(&E::create_endpoint(), &RequestBody::form(draft))
            .await
    }

    async fn update(&self, id: &EntityId, draft: &E::Draft) -> Result<E, ApiError> {
        self.executor
            .execute_data(&E::update_endpoint(id), &RequestBody::form(draft))
            .await
    }

    async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        self.executor
            .execute_empty(&E::delete_endpoint(id), &RequestBody::Empty)
            .await
    }
}
