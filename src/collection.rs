use std::collections::HashSet;

use tracing::warn;

use crate::error::{ApiError, AuthError, ErrorCategory, NETWORK_ERROR_MESSAGE};
use crate::models::Identified;

pub trait Filter<T> {
    fn matches(&self, item: &T) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFilter;

impl<T> Filter<T> for NoFilter {
    fn matches(&self, _item: &T) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Load,
    Search,
    Create,
    Update,
    Delete,
    Apply,
    UpdateStatus,
    Login,
    Register,
    UpdateProfile,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Load => "Loading",
            Action::Search => "Search",
            Action::Create => "Create",
            Action::Update => "Update",
            Action::Delete => "Delete",
            Action::Apply => "Application",
            Action::UpdateStatus => "Status update",
            Action::Login => "Login",
            Action::Register => "Registration",
            Action::UpdateProfile => "Profile update",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub category: ErrorCategory,
}

impl Notice {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: ErrorCategory::Validation,
        }
    }

    pub fn from_error(err: &ApiError, fallback: &str) -> Self {
        let message = match err {
            ApiError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ApiError::Validation(_) | ApiError::Busy(_) | ApiError::Unauthorized => err.to_string(),
            _ => fallback.to_string(),
        };
        Self {
            message,
            category: err.category(),
        }
    }

    pub fn from_auth(err: &AuthError) -> Self {
        match &err.source {
            Some(source) if matches!(source, ApiError::Network(_)) => {
                Self::from_error(source, &err.message)
            }
            Some(source) => Self {
                message: err.message.clone(),
                category: source.category(),
            },
            None => Self {
                message: err.message.clone(),
                category: ErrorCategory::Other,
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct InFlight {
    active: HashSet<Action>,
}

impl InFlight {
    pub fn begin(&mut self, action: Action) -> Result<(), ApiError> {
        if self.active.insert(action) {
            Ok(())
        } else {
            Err(ApiError::Busy(action.label()))
        }
    }

    pub fn finish(&mut self, action: Action) {
        self.active.remove(&action);
    }
}

#[derive(Debug, Default)]
pub struct PageStatus {
    loading: bool,
    error: Option<Notice>,
    in_flight: InFlight,
}

impl PageStatus {
    pub fn error(&self) -> Option<&Notice> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, notice: Notice) {
        self.error = Some(notice);
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Failures become the page notice and yield `None`.
    pub fn run<R>(
        &mut self,
        action: Action,
        fallback: &str,
        call: impl FnOnce() -> Result<R, ApiError>,
    ) -> Option<R> {
        self.run_with(action, call, |err| Notice::from_error(err, fallback))
    }

    pub fn run_with<R, E: std::fmt::Display>(
        &mut self,
        action: Action,
        call: impl FnOnce() -> Result<R, E>,
        notice: impl FnOnce(&E) -> Notice,
    ) -> Option<R> {
        let tracks_loading = matches!(action, Action::Load | Action::Search);
        // load and search both replace the items, so they share one flag
        if tracks_loading && self.loading {
            self.error = Some(Notice::from_error(&ApiError::Busy(Action::Load.label()), ""));
            return None;
        }
        if let Err(err) = self.in_flight.begin(action) {
            self.error = Some(Notice::from_error(&err, ""));
            return None;
        }

        if tracks_loading {
            self.loading = true;
        }
        let result = call();
        self.in_flight.finish(action);
        if tracks_loading {
            self.loading = false;
        }

        match result {
            Ok(value) => {
                self.error = None;
                Some(value)
            }
            Err(err) => {
                let notice = notice(&err);
                warn!(action = action.label(), category = %notice.category, error = %err, "Request failed");
                self.error = Some(notice);
                None
            }
        }
    }
}

#[derive(Debug)]
pub struct Collection<T, F = NoFilter> {
    items: Vec<T>,
    filtered: Vec<usize>,
    filter: F,
    status: PageStatus,
}

impl<T, F: Default> Default for Collection<T, F> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            filtered: Vec::new(),
            filter: F::default(),
            status: PageStatus::default(),
        }
    }
}

impl<T: Identified, F: Filter<T> + Default> Collection<T, F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn filtered(&self) -> impl Iterator<Item = &T> + '_ {
        self.filtered.iter().map(move |&index| &self.items[index])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn active_filter(&self) -> &F {
        &self.filter
    }

    pub fn status_mut(&mut self) -> &mut PageStatus {
        &mut self.status
    }

    pub fn error(&self) -> Option<&Notice> {
        self.status.error()
    }

    pub fn run<R>(
        &mut self,
        action: Action,
        fallback: &str,
        call: impl FnOnce() -> Result<R, ApiError>,
    ) -> Option<R> {
        self.status.run(action, fallback, call)
    }

    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.recompute();
    }

    pub fn apply_filter(&mut self, filter: F) {
        self.filter = filter;
        self.recompute();
    }

    pub fn reset_filter(&mut self) {
        self.apply_filter(F::default());
    }

    pub fn insert(&mut self, item: T) {
        self.items.push(item);
        self.recompute();
    }

    /// False when the id is not present.
    pub fn replace_one(&mut self, item: T) -> bool {
        let Some(slot) = self.items.iter_mut().find(|existing| existing.id() == item.id()) else {
            return false;
        };
        *slot = item;
        self.recompute();
        true
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        let removed = self.items.remove(index);
        self.recompute();
        Some(removed)
    }

    fn recompute(&mut self) {
        let filter = &self.filter;
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| filter.matches(item))
            .map(|(index, _)| index)
            .collect();
    }
}

#[cfg(test)]
impl InFlight {
    pub fn is_active(&self, action: Action) -> bool {
        self.active.contains(&action)
    }
}

#[cfg(test)]
impl PageStatus {
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn in_flight(&mut self) -> &mut InFlight {
        &mut self.in_flight
    }
}

#[cfg(test)]
impl<T: Identified, F: Filter<T> + Default> Collection<T, F> {
    pub fn filtered_ids(&self) -> Vec<i64> {
        self.filtered().map(Identified::id).collect()
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        even: bool,
    }

    impl Identified for Item {
        fn id(&self) -> i64 {
            self.id
        }
    }

    #[derive(Debug, Default)]
    struct EvenOnly(bool);

    impl Filter<Item> for EvenOnly {
        fn matches(&self, item: &Item) -> bool {
            !self.0 || item.even
        }
    }

    fn items(ids: &[i64]) -> Vec<Item> {
        ids.iter().map(|&id| Item { id, even: id % 2 == 0 }).collect()
    }

    #[test]
    fn test_filtered_tracks_items_and_predicate() {
        let mut view: Collection<Item, EvenOnly> = Collection::new();
        view.replace(items(&[1, 2, 3, 4]));
        assert_eq!(view.filtered_ids(), vec![1, 2, 3, 4]);

        view.apply_filter(EvenOnly(true));
        assert_eq!(view.filtered_ids(), vec![2, 4]);

        view.replace(items(&[6, 5]));
        assert_eq!(view.filtered_ids(), vec![6]);
        assert!(view.filtered().all(|item| view.items().contains(item)));

        view.reset_filter();
        assert_eq!(view.filtered_ids(), vec![6, 5]);
    }

    #[test]
    fn test_reconciliation_keeps_order() {
        let mut view: Collection<Item> = Collection::new();
        view.replace(items(&[3, 1, 2]));

        view.insert(Item { id: 9, even: false });
        assert_eq!(view.filtered_ids(), vec![3, 1, 2, 9]);

        assert!(view.replace_one(Item { id: 1, even: true }));
        assert_eq!(view.filtered_ids(), vec![3, 1, 2, 9]);
        assert!(view.get(1).unwrap().even);
        assert!(!view.replace_one(Item { id: 42, even: true }));

        assert!(view.remove(3).is_some());
        assert!(view.remove(3).is_none());
        assert_eq!(view.filtered_ids(), vec![1, 2, 9]);
    }

    #[test]
    fn test_run_records_notice_and_clears_on_success() {
        let mut view: Collection<Item> = Collection::new();

        let result: Option<()> = view.run(Action::Load, "Failed to fetch items", || {
            Err(ApiError::Server { status: 500, message: None })
        });
        assert!(result.is_none());
        assert_eq!(view.error().unwrap().message, "Failed to fetch items");
        assert!(!view.is_loading());

        let result = view.run(Action::Load, "Failed to fetch items", || Ok(items(&[1])));
        view.replace(result.unwrap());
        assert!(view.error().is_none());
    }

    #[test]
    fn test_network_failure_uses_fixed_message() {
        let mut status = PageStatus::default();
        let _: Option<()> = status.run(Action::Load, "Failed to fetch items", || {
            Err(ApiError::Network("timeout".into()))
        });
        let notice = status.error().unwrap();
        assert_eq!(notice.message, NETWORK_ERROR_MESSAGE);
        assert_eq!(notice.category, ErrorCategory::Network);
    }

    #[test]
    fn test_second_dispatch_is_rejected_while_outstanding() {
        let mut status = PageStatus::default();
        status.in_flight().begin(Action::Apply).unwrap();

        let mut called = false;
        let result = status.run(Action::Apply, "Failed", || {
            called = true;
            Ok(())
        });
        assert!(result.is_none());
        assert!(!called);
        assert_eq!(status.error().unwrap().message, "Application is already in progress");

        status.in_flight().finish(Action::Apply);
        assert!(status.run(Action::Apply, "Failed", || Ok(())).is_some());
        assert!(!status.in_flight().is_active(Action::Apply));
    }

    #[test]
    fn test_search_is_rejected_while_loading() {
        let mut status = PageStatus::default();
        status.loading = true;

        let mut called = false;
        let result = status.run(Action::Search, "Search failed", || {
            called = true;
            Ok(())
        });
        assert!(result.is_none());
        assert!(!called);
        assert_eq!(status.error().unwrap().category, ErrorCategory::Validation);
        assert!(status.is_loading());
    }
}
