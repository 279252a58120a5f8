//! One fully wired set of stores and their orchestrator.

use crate::orchestrator::{DataOrchestrator, StoreSet};
use crate::store::{ChatStore, MindfulnessStore, NutritionStore, ProfileStore, ProgressStore, SeasonStore};
use genesis_core::Gateways;
use genesis_core::config::GenesisConfig;
use std::sync::Arc;

/// Every domain store built against one set of gateways.
///
/// Construct one per app session; tests build isolated instances against an
/// in-memory backend.
#[derive(Clone)]
pub struct SyncContext {
    pub nutrition: Arc<NutritionStore>,
    pub mindfulness: Arc<MindfulnessStore>,
    pub chat: Arc<ChatStore>,
    pub season: Arc<SeasonStore>,
    pub progress: Arc<ProgressStore>,
    pub profile: Arc<ProfileStore>,
    pub orchestrator: Arc<DataOrchestrator>,
}

impl SyncContext {
    pub fn new(gateways: Gateways, config: &GenesisConfig) -> Self {
        let sync = &config.sync;

        let nutrition = Arc::new(NutritionStore::new(
            gateways.nutrition.clone(),
            config.nutrition.default_targets,
        ));
        let mindfulness = Arc::new(MindfulnessStore::new(
            gateways.mindfulness.clone(),
            gateways.coach.clone(),
            sync.history_limit,
        ));
        let chat = ChatStore::new(
            gateways.chat.clone(),
            gateways.push.clone(),
            sync.recent_message_limit,
            sync.event_queue_capacity,
        );
        let season = Arc::new(SeasonStore::new(gateways.season.clone()));
        let progress = Arc::new(ProgressStore::new(
            gateways.checkins.clone(),
            gateways.coach.clone(),
            sync.weight_history_limit,
        ));
        let profile = Arc::new(ProfileStore::new(gateways.profile.clone()));

        let stores = StoreSet::new()
            .with_store(profile.clone())
            .with_store(nutrition.clone())
            .with_store(mindfulness.clone())
            .with_store(chat.clone())
            .with_store(season.clone())
            .with_store(progress.clone())
            .with_live(chat.clone());
        let orchestrator = Arc::new(DataOrchestrator::new(stores, sync));

        Self {
            nutrition,
            mindfulness,
            chat,
            season,
            progress,
            profile,
            orchestrator,
        }
    }
}
