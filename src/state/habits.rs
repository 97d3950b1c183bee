//! Habits hook.
//!
//! Unlike the other hooks, habit mutations patch the local list by id
//! instead of refetching: create appends, update replaces, delete removes,
//! and completion copies the streak the server reports back.

#[cfg(test)]
#[path = "habits_test.rs"]
mod habits_test;

use std::sync::Arc;

use time::Date;
use time::macros::format_description;

use super::resource::{Resource, ResourceState};
use crate::error::ApiError;
use crate::net::api;
use crate::net::gateway::Gateway;
use crate::net::types::{CompletionResult, Habit, HabitCompletion, HabitPatch, NewHabit};

const FETCH_FAILED: &str = "Failed to fetch habits";

#[derive(Clone)]
pub struct HabitsHook {
    gateway: Arc<Gateway>,
    cell: Resource<Vec<Habit>>,
}

impl HabitsHook {
    pub async fn mount(gateway: Arc<Gateway>) -> Self {
        let hook = Self::new(gateway);
        hook.refetch().await;
        hook
    }

    #[must_use]
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway, cell: Resource::new(Vec::new()) }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState<Vec<Habit>> {
        self.cell.snapshot()
    }

    pub fn unmount(&self) {
        self.cell.unmount();
    }

    pub async fn refetch(&self) {
        self.cell.load(api::habits(&self.gateway), FETCH_FAILED).await;
    }

    /// # Errors
    ///
    /// Logged and returned; the local list is untouched.
    pub async fn create(&self, habit: &NewHabit) -> Result<Habit, ApiError> {
        let created = api::create_habit(&self.gateway, habit)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "creating habit failed"))?;
        let appended = created.clone();
        self.cell.update(move |habits| habits.push(appended));
        Ok(created)
    }

    /// Record a completion for `date`. The local streak follows the
    /// server's answer; a missing or zero streak keeps the old value.
    ///
    /// # Errors
    ///
    /// Logged and returned; the local list is untouched.
    pub async fn mark_complete(&self, habit_id: i64, date: Date, notes: &str) -> Result<CompletionResult, ApiError> {
        let completion = HabitCompletion { date: iso_date(date)?, notes: notes.to_owned() };
        let result = api::complete_habit(&self.gateway, habit_id, &completion)
            .await
            .inspect_err(|e| tracing::error!(error = %e, habit_id, "marking habit complete failed"))?;

        let streak = result
            .habit
            .as_ref()
            .and_then(|h| h.current_streak)
            .filter(|s| *s > 0);
        if let Some(streak) = streak {
            self.cell.update(|habits| {
                if let Some(habit) = habits.iter_mut().find(|h| h.id == habit_id) {
                    habit.current_streak = streak;
                }
            });
        }
        Ok(result)
    }

    /// # Errors
    ///
    /// Logged and returned; the local list is untouched.
    pub async fn update(&self, habit_id: i64, patch: &HabitPatch) -> Result<Habit, ApiError> {
        let updated = api::update_habit(&self.gateway, habit_id, patch)
            .await
            .inspect_err(|e| tracing::error!(error = %e, habit_id, "updating habit failed"))?;
        let replacement = updated.clone();
        self.cell.update(move |habits| {
            for habit in habits.iter_mut().filter(|h| h.id == habit_id) {
                *habit = replacement.clone();
            }
        });
        Ok(updated)
    }

    /// # Errors
    ///
    /// Logged and returned; the local list is untouched.
    pub async fn delete(&self, habit_id: i64) -> Result<(), ApiError> {
        api::delete_habit(&self.gateway, habit_id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, habit_id, "deleting habit failed"))?;
        self.cell.update(|habits| habits.retain(|h| h.id != habit_id));
        Ok(())
    }
}

fn iso_date(date: Date) -> Result<String, ApiError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|e| ApiError::Decode(e.to_string()))
}
