//! Derived views over store state.
//!
//! Every selector is a pure function of the state it is given: equal states
//! give equal results, and totals are summed from the current collections on
//! each call. [`Memo`] caches a result against a store revision.

use crate::store::{ChatState, MindfulnessState, NutritionState, ProfileState, ProgressState, SeasonState};
use chrono::NaiveDate;
use genesis_core::chat::Message;
use genesis_core::nutrition::{FoodItem, MealType};
use genesis_core::progress::{CoachNote, Streak, StreakType};
use genesis_core::season::SeasonPhase;
use parking_lot::Mutex;
use std::sync::Arc;

/// Summed macros of a set of food items.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    fn sum<'a>(items: impl IntoIterator<Item = &'a FoodItem>) -> Self {
        items.into_iter().fold(Self::default(), |totals, item| Self {
            calories: totals.calories + item.calories,
            protein: totals.protein + item.protein,
            carbs: totals.carbs + item.carbs,
            fat: totals.fat + item.fat,
        })
    }
}

// Nutrition

pub fn nutrition_totals(state: &NutritionState) -> MacroTotals {
    MacroTotals::sum(state.meals.iter())
}

pub fn meal_totals(state: &NutritionState, meal: MealType) -> MacroTotals {
    MacroTotals::sum(state.meals.get(meal))
}

/// What is left of today's targets, floored at zero.
pub fn remaining_macros(state: &NutritionState) -> MacroTotals {
    let eaten = nutrition_totals(state);
    let targets = &state.targets;
    MacroTotals {
        calories: (targets.calories - eaten.calories).max(0.0),
        protein: (targets.protein - eaten.protein).max(0.0),
        carbs: (targets.carbs - eaten.carbs).max(0.0),
        fat: (targets.fat - eaten.fat).max(0.0),
    }
}

// Mindfulness

pub fn todays_mindfulness_count(state: &MindfulnessState) -> usize {
    state.today_sessions.len()
}

/// True iff one of `today`'s sessions is completed.
pub fn has_completed_mindfulness_today(state: &MindfulnessState, today: NaiveDate) -> bool {
    state
        .today_sessions
        .iter()
        .any(|session| session.date == today && session.completed)
}

/// Total minutes across the loaded history, rounded.
pub fn total_mindfulness_minutes(state: &MindfulnessState) -> u32 {
    let seconds: u64 = state
        .session_history
        .iter()
        .map(|session| u64::from(session.duration_seconds))
        .sum();
    ((seconds + 30) / 60) as u32
}

// Chat

pub fn last_message(state: &ChatState) -> Option<&Message> {
    state.messages.last()
}

pub fn has_unread(state: &ChatState) -> bool {
    state.unread_count > 0
}

// Season

pub fn current_week(state: &SeasonState) -> u32 {
    state
        .active_season
        .as_ref()
        .and_then(|season| season.current_week)
        .unwrap_or(1)
}

pub fn current_phase(state: &SeasonState) -> SeasonPhase {
    state
        .active_season
        .as_ref()
        .and_then(|season| season.current_phase)
        .unwrap_or_default()
}

pub fn has_today_workout(state: &SeasonState) -> bool {
    state.today_workout.is_some()
}

// Progress

pub fn streak_of(state: &ProgressState, kind: StreakType) -> Option<&Streak> {
    state.streaks.iter().find(|streak| streak.streak_type == kind)
}

/// The note shown first on the home screen.
pub fn active_coach_note(state: &ProgressState) -> Option<&CoachNote> {
    state.coach_notes.first()
}

pub fn coach_notes_for<'a>(state: &'a ProgressState, location: &str) -> Vec<&'a CoachNote> {
    state
        .coach_notes
        .iter()
        .filter(|note| note.shows_on(location))
        .collect()
}

pub fn has_today_checkin(state: &ProgressState) -> bool {
    state.today_checkin.is_some()
}

// Profile

pub fn is_hybrid_plan(state: &ProfileState) -> bool {
    state.subscription.as_ref().is_some_and(|s| s.is_hybrid())
}

pub fn onboarding_completed(state: &ProfileState) -> bool {
    state.profile.as_ref().is_some_and(|p| p.onboarding_completed)
}

/// Caches one selector result per store revision.
///
/// When a new revision yields a value equal to the cached one, the cached
/// `Arc` is kept, so callers comparing by pointer see no change.
pub struct Memo<T> {
    cached: Mutex<Option<(u64, Arc<T>)>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }
}

impl<T: PartialEq> Memo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, revision: u64, compute: impl FnOnce() -> T) -> Arc<T> {
        let mut cached = self.cached.lock();
        match cached.as_mut() {
            Some((seen, value)) if *seen == revision => Arc::clone(value),
            Some((seen, value)) => {
                let fresh = compute();
                if **value != fresh {
                    *value = Arc::new(fresh);
                }
                *seen = revision;
                Arc::clone(value)
            }
            None => {
                let value = Arc::new(compute());
                *cached = Some((revision, Arc::clone(&value)));
                value
            }
        }
    }

    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesis_core::EntityId;
    use genesis_core::mindfulness::MindfulnessSession;
    use genesis_core::nutrition::{MacroTargets, Meals};

    fn food(id: &str, calories: f64, protein: f64, carbs: f64, fat: f64) -> FoodItem {
        FoodItem {
            id: EntityId::new(id),
            name: id.to_string(),
            calories,
            protein,
            carbs,
            fat,
        }
    }

    fn session(id: &str, date: NaiveDate, seconds: u32, completed: bool) -> MindfulnessSession {
        MindfulnessSession {
            id: EntityId::new(id),
            user_id: None,
            date,
            session_id: "breath".into(),
            session_title: "Breath".into(),
            category: None,
            duration_seconds: seconds,
            target_duration_seconds: None,
            completed,
            phases_completed: None,
            total_phases: None,
            created_at: None,
        }
    }

    fn nutrition() -> NutritionState {
        NutritionState {
            meals: Meals {
                breakfast: vec![food("a1", 300.0, 20.0, 30.0, 10.0)],
                lunch: vec![food("b1", 200.0, 10.0, 20.0, 5.0), food("b2", 150.0, 5.0, 10.0, 2.0)],
                dinner: vec![],
                snacks: vec![food("c1", 100.0, 1.0, 15.0, 3.0)],
            },
            ..NutritionState::new(MacroTargets::default())
        }
    }

    #[test]
    fn test_totals_sum_every_partition() {
        let totals = nutrition_totals(&nutrition());
        assert_eq!(
            totals,
            MacroTotals {
                calories: 750.0,
                protein: 36.0,
                carbs: 75.0,
                fat: 20.0,
            }
        );
        assert_eq!(meal_totals(&nutrition(), MealType::Lunch).calories, 350.0);
        assert_eq!(meal_totals(&nutrition(), MealType::Dinner), MacroTotals::default());
    }

    #[test]
    fn test_equal_states_give_equal_totals() {
        assert_eq!(nutrition_totals(&nutrition()), nutrition_totals(&nutrition().clone()));
    }

    #[test]
    fn test_remaining_is_floored_at_zero() {
        let mut state = nutrition();
        state.targets = MacroTargets {
            calories: 500.0,
            protein: 100.0,
            carbs: 75.0,
            fat: 10.0,
        };
        let remaining = remaining_macros(&state);
        assert_eq!(remaining.calories, 0.0);
        assert_eq!(remaining.protein, 64.0);
        assert_eq!(remaining.carbs, 0.0);
        assert_eq!(remaining.fat, 0.0);
    }

    #[test]
    fn test_completed_today_needs_a_completed_session_dated_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut state = MindfulnessState {
            today_sessions: vec![session("m1", today, 120, false), session("m2", yesterday, 300, true)],
            ..Default::default()
        };
        assert!(!has_completed_mindfulness_today(&state, today));

        state.today_sessions.push(session("m3", today, 60, true));
        assert!(has_completed_mindfulness_today(&state, today));
        assert_eq!(todays_mindfulness_count(&state), 3);
    }

    #[test]
    fn test_total_minutes_rounds_the_sum() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let state = MindfulnessState {
            session_history: vec![session("m1", day, 100, true), session("m2", day, 50, true)],
            ..Default::default()
        };
        // 150s is 2.5 minutes
        assert_eq!(total_mindfulness_minutes(&state), 3);
        assert_eq!(total_mindfulness_minutes(&MindfulnessState::default()), 0);
    }

    #[test]
    fn test_season_defaults_without_active_season() {
        let state = SeasonState::default();
        assert_eq!(current_week(&state), 1);
        assert_eq!(current_phase(&state), SeasonPhase::Foundation);
        assert!(!has_today_workout(&state));
    }

    #[test]
    fn test_memo_keeps_equal_values() {
        let memo = Memo::new();
        let first = memo.get(1, || nutrition_totals(&nutrition()));
        let same_revision = memo.get(1, || unreachable!());
        assert!(Arc::ptr_eq(&first, &same_revision));

        let equal = memo.get(2, || nutrition_totals(&nutrition()));
        assert!(Arc::ptr_eq(&first, &equal));

        let changed = memo.get(3, || MacroTotals::default());
        assert!(!Arc::ptr_eq(&first, &changed));
        assert_eq!(*changed, MacroTotals::default());
    }
}
