//! The Remote Data Gateway as one injectable bundle.

use crate::chat::ChatGateway;
use crate::mindfulness::MindfulnessGateway;
use crate::nutrition::NutritionGateway;
use crate::profile::ProfileGateway;
use crate::progress::{CheckinGateway, CoachGateway};
use crate::realtime::PushGateway;
use crate::season::SeasonGateway;
use std::sync::Arc;

/// Every gateway the stores consume.
///
/// A single backend usually implements all of them, see [`Gateways::from_backend`].
#[derive(Clone)]
pub struct Gateways {
    pub nutrition: Arc<dyn NutritionGateway>,
    pub mindfulness: Arc<dyn MindfulnessGateway>,
    pub chat: Arc<dyn ChatGateway>,
    pub season: Arc<dyn SeasonGateway>,
    pub checkins: Arc<dyn CheckinGateway>,
    pub coach: Arc<dyn CoachGateway>,
    pub profile: Arc<dyn ProfileGateway>,
    pub push: Arc<dyn PushGateway>,
}

impl Gateways {
    /// Uses the same backend for request/response and push.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: NutritionGateway
            + MindfulnessGateway
            + ChatGateway
            + SeasonGateway
            + CheckinGateway
            + CoachGateway
            + ProfileGateway
            + PushGateway
            + 'static,
    {
        Self {
            nutrition: backend.clone(),
            mindfulness: backend.clone(),
            chat: backend.clone(),
            season: backend.clone(),
            checkins: backend.clone(),
            coach: backend.clone(),
            profile: backend.clone(),
            push: backend,
        }
    }

    /// Replaces the push half, e.g. with a polling channel.
    pub fn with_push(mut self, push: Arc<dyn PushGateway>) -> Self {
        self.push = push;
        self
    }
}
