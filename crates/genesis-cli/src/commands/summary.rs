use genesis_application::SyncContext;
use genesis_application::selectors;
use genesis_core::date::today;

/// Prints what the home screen would show.
pub fn print(ctx: &SyncContext) {
    let day = today();

    let (totals, remaining, items) = ctx.nutrition.read(|s| {
        (
            selectors::nutrition_totals(s),
            selectors::remaining_macros(s),
            s.meals.len(),
        )
    });
    println!("Nutrition");
    println!(
        "  {items} items, {:.0} kcal / P {:.0} C {:.0} F {:.0}",
        totals.calories, totals.protein, totals.carbs, totals.fat
    );
    println!(
        "  remaining: {:.0} kcal / P {:.0} C {:.0} F {:.0}",
        remaining.calories, remaining.protein, remaining.carbs, remaining.fat
    );

    let (sessions, minutes, done) = ctx.mindfulness.read(|s| {
        (
            selectors::todays_mindfulness_count(s),
            selectors::total_mindfulness_minutes(s),
            selectors::has_completed_mindfulness_today(s, day),
        )
    });
    println!("Mindfulness");
    println!("  {sessions} sessions today, {minutes} min total, completed: {done}");

    let (messages, unread, last) = ctx.chat.read(|s| {
        (
            s.messages.len(),
            selectors::has_unread(s),
            selectors::last_message(s).map(|m| m.content.clone()),
        )
    });
    println!("Chat");
    println!("  {messages} messages, unread: {unread}");
    if let Some(last) = last {
        println!("  last: {last}");
    }

    let (week, phase, workout) = ctx.season.read(|s| {
        (
            selectors::current_week(s),
            selectors::current_phase(s),
            s.today_workout.as_ref().map(|w| w.workout.title.clone()),
        )
    });
    println!("Season");
    println!("  week {week}, phase {phase:?}");
    println!("  today: {}", workout.as_deref().unwrap_or("rest day"));

    let (checked_in, note, streaks) = ctx.progress.read(|s| {
        (
            selectors::has_today_checkin(s),
            selectors::active_coach_note(s).map(|n| n.title.clone()),
            s.streaks
                .iter()
                .map(|streak| format!("{} {}", streak.streak_type, streak.current_count))
                .collect::<Vec<_>>(),
        )
    });
    println!("Progress");
    println!("  checked in today: {checked_in}");
    if !streaks.is_empty() {
        println!("  streaks: {}", streaks.join(", "));
    }
    if let Some(note) = note {
        println!("  coach note: {note}");
    }

    let (name, hybrid, onboarded) = ctx.profile.read(|s| {
        (
            s.profile.as_ref().and_then(|p| p.full_name.clone()),
            selectors::is_hybrid_plan(s),
            selectors::onboarding_completed(s),
        )
    });
    println!("Profile");
    println!(
        "  {} (hybrid plan: {hybrid}, onboarded: {onboarded})",
        name.as_deref().unwrap_or("unnamed")
    );

    for (store, status) in ctx.orchestrator.statuses() {
        if let Some(error) = status.error {
            println!("! {store}: {error}");
        }
    }
}
