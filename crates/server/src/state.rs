use std::sync::Arc;

use sara_channels::ChannelRegistry;
use sara_db::{DbPool, InteractionRepository, KnowledgeBaseRepository};
use sara_pipeline::Dispatcher;

/// Shared handles behind every route. Everything is reference-counted; the
/// state clones per request.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<ChannelRegistry>,
    pub interactions: Arc<dyn InteractionRepository>,
    pub knowledge: Arc<dyn KnowledgeBaseRepository>,
    pub db_pool: DbPool,
    pub whatsapp_verify_token: Option<String>,
}
