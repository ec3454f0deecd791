//! Client-side entity store for plans.
//!
//! The store is the single owner of what the caller currently believes the
//! server holds: the last fetched collection, the record being viewed or
//! edited, and the in-flight flags a front end renders from. Every operation
//! is one request/response round trip against a [`PlanApi`]; outcomes are
//! applied through explicit transition methods on [`State`] so they can be
//! exercised without any I/O.

use tracing::debug;

use crate::api::{ApiError, PlanApi};
use crate::model::{FieldError, Plan, UserRef};

/// Which state slot a read targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    List,
    Entity,
    Users,
}

/// Handle identifying one issued read request. A completion carrying a
/// token older than the slot's latest is discarded instead of overwriting
/// newer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
    slot: Slot,
    seq: u64,
}

/// Snapshot of everything the store knows, with a defined initial state
#[derive(Debug, Default)]
pub struct State {
    /// Last fetched collection; a completed fetch replaces it wholesale
    pub entities: Vec<Plan>,
    /// The record being viewed or edited, empty draft otherwise
    pub entity: Plan,
    /// Selectable users for the edit form
    pub users: Vec<UserRef>,
    /// A read is in flight
    pub loading: bool,
    /// A write is in flight
    pub updating: bool,
    /// The most recent write completed; cleared when any new request starts
    pub update_success: bool,
    list_seq: u64,
    entity_seq: u64,
    users_seq: u64,
}

impl State {
    fn seq_mut(&mut self, slot: Slot) -> &mut u64 {
        match slot {
            Slot::List => &mut self.list_seq,
            Slot::Entity => &mut self.entity_seq,
            Slot::Users => &mut self.users_seq,
        }
    }

    fn is_current(&self, token: FetchToken) -> bool {
        let seq = match token.slot {
            Slot::List => self.list_seq,
            Slot::Entity => self.entity_seq,
            Slot::Users => self.users_seq,
        };
        token.seq == seq
    }

    /// A read request is going out; returns the token its completion must
    /// present to be applied.
    pub fn read_started(&mut self, slot: Slot) -> FetchToken {
        self.update_success = false;
        self.loading = true;
        let seq = self.seq_mut(slot);
        *seq += 1;
        FetchToken { slot, seq: *seq }
    }

    /// A write request is going out
    pub fn write_started(&mut self) {
        self.update_success = false;
        self.updating = true;
    }

    /// Collection fetch completed. Returns false if the response was stale
    /// and discarded.
    pub fn list_loaded(&mut self, token: FetchToken, plans: Vec<Plan>) -> bool {
        if token.slot != Slot::List || !self.is_current(token) {
            return false;
        }
        self.entities = plans;
        self.loading = false;
        true
    }

    /// Single-record fetch completed
    pub fn entity_loaded(&mut self, token: FetchToken, plan: Plan) -> bool {
        if token.slot != Slot::Entity || !self.is_current(token) {
            return false;
        }
        self.entity = plan;
        self.loading = false;
        true
    }

    /// User list fetch completed
    pub fn users_loaded(&mut self, token: FetchToken, users: Vec<UserRef>) -> bool {
        if token.slot != Slot::Users || !self.is_current(token) {
            return false;
        }
        self.users = users;
        self.loading = false;
        true
    }

    /// A read failed; clears `loading` unless a newer read is in flight.
    /// Held data is left untouched.
    pub fn read_failed(&mut self, token: FetchToken) {
        if self.is_current(token) {
            self.loading = false;
        }
    }

    /// A write completed. `saved` carries the server's record for create and
    /// update; `None` means a deletion, which empties the detail slot. Any
    /// in-flight read of the detail slot is invalidated since the write is
    /// newer truth.
    pub fn write_succeeded(&mut self, saved: Option<Plan>) {
        self.updating = false;
        self.update_success = true;
        self.entity_seq += 1;
        match saved {
            Some(plan) => self.entity = plan,
            None => self.entity = Plan::default(),
        }
    }

    /// A write failed; held data is left untouched
    pub fn write_failed(&mut self) {
        self.updating = false;
    }

    /// Restore the detail slot to the empty draft, for a fresh create flow
    pub fn reset(&mut self) {
        self.entity = Plan::default();
        self.update_success = false;
        self.entity_seq += 1;
    }
}

/// Result of a successful write, returned to the caller so it can decide
/// what to do next (e.g. navigate back to the list view)
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(Plan),
    Updated(Plan),
    Deleted(i64),
}

impl SaveOutcome {
    /// The persisted record, if the outcome carries one
    pub fn plan(&self) -> Option<&Plan> {
        match self {
            Self::Created(plan) | Self::Updated(plan) => Some(plan),
            Self::Deleted(_) => None,
        }
    }
}

/// Entity store mediating between a caller and the remote plans API
pub struct PlanStore<A> {
    api: A,
    state: State,
}

impl<A: PlanApi> PlanStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: State::default(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Fetch the full collection, replacing `entities` on success
    pub fn fetch_all(&mut self) -> Result<&[Plan], ApiError> {
        let token = self.state.read_started(Slot::List);
        match self.api.list_plans() {
            Ok(plans) => {
                self.state.list_loaded(token, plans);
                Ok(&self.state.entities)
            }
            Err(e) => {
                self.state.read_failed(token);
                Err(e)
            }
        }
    }

    /// Fetch one record by id, replacing `entity` on success. A NotFound
    /// leaves `entity` unchanged.
    pub fn fetch_one(&mut self, id: i64) -> Result<&Plan, ApiError> {
        let token = self.state.read_started(Slot::Entity);
        match self.api.get_plan(id) {
            Ok(plan) => {
                self.state.entity_loaded(token, plan);
                Ok(&self.state.entity)
            }
            Err(e) => {
                self.state.read_failed(token);
                Err(e)
            }
        }
    }

    /// Fetch the selectable users for the edit form
    pub fn fetch_users(&mut self) -> Result<&[UserRef], ApiError> {
        let token = self.state.read_started(Slot::Users);
        match self.api.list_users() {
            Ok(users) => {
                self.state.users_loaded(token, users);
                Ok(&self.state.users)
            }
            Err(e) => {
                self.state.read_failed(token);
                Err(e)
            }
        }
    }

    /// Create a new plan. The draft must not carry an id and must pass
    /// field validation; nothing is sent otherwise.
    pub fn create(&mut self, plan: Plan) -> Result<SaveOutcome, ApiError> {
        if plan.id.is_some() {
            return Err(ApiError::Validation(vec![FieldError::new(
                "id",
                "must be absent when creating",
            )]));
        }
        let errors = plan.validate();
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        self.state.write_started();
        match self.api.create_plan(&plan) {
            Ok(saved) => {
                debug!(id = saved.id, "plan created");
                self.state.write_succeeded(Some(saved.clone()));
                Ok(SaveOutcome::Created(saved))
            }
            Err(e) => {
                self.state.write_failed();
                Err(e)
            }
        }
    }

    /// Replace an existing plan. The record must carry an id and must pass
    /// field validation.
    pub fn update(&mut self, plan: Plan) -> Result<SaveOutcome, ApiError> {
        if plan.id.is_none() {
            return Err(ApiError::Validation(vec![FieldError::new(
                "id",
                "must be present when updating",
            )]));
        }
        let errors = plan.validate();
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        self.state.write_started();
        match self.api.update_plan(&plan) {
            Ok(saved) => {
                debug!(id = saved.id, "plan updated");
                self.state.write_succeeded(Some(saved.clone()));
                Ok(SaveOutcome::Updated(saved))
            }
            Err(e) => {
                self.state.write_failed();
                Err(e)
            }
        }
    }

    /// Change only the fields present in `plan`, leaving the rest as the
    /// server holds them
    pub fn partial_update(&mut self, plan: Plan) -> Result<SaveOutcome, ApiError> {
        if plan.id.is_none() {
            return Err(ApiError::Validation(vec![FieldError::new(
                "id",
                "must be present when updating",
            )]));
        }
        let errors = plan.validate_partial();
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        self.state.write_started();
        match self.api.patch_plan(&plan) {
            Ok(saved) => {
                debug!(id = saved.id, "plan partially updated");
                self.state.write_succeeded(Some(saved.clone()));
                Ok(SaveOutcome::Updated(saved))
            }
            Err(e) => {
                self.state.write_failed();
                Err(e)
            }
        }
    }

    /// Delete a plan by id; the record will be absent from the next fetch
    pub fn delete(&mut self, id: i64) -> Result<SaveOutcome, ApiError> {
        self.state.write_started();
        match self.api.delete_plan(id) {
            Ok(()) => {
                debug!(id, "plan deleted");
                self.state.write_succeeded(None);
                Ok(SaveOutcome::Deleted(id))
            }
            Err(e) => {
                self.state.write_failed();
                Err(e)
            }
        }
    }

    /// Clear the detail slot for a fresh create flow
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    /// In-memory stand-in for the server, assigning ids the way it would
    struct MockApi {
        plans: RefCell<BTreeMap<i64, Plan>>,
        users: Vec<UserRef>,
        next_id: Cell<i64>,
        fail_next: Cell<bool>,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                plans: RefCell::new(BTreeMap::new()),
                users: vec![
                    UserRef {
                        id: 1,
                        login: Some("admin".to_string()),
                    },
                    UserRef {
                        id: 2,
                        login: Some("user".to_string()),
                    },
                ],
                next_id: Cell::new(7),
                fail_next: Cell::new(false),
            }
        }

        fn check_failure(&self) -> Result<(), ApiError> {
            if self.fail_next.replace(false) {
                Err(ApiError::Network("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl PlanApi for MockApi {
        fn list_plans(&self) -> Result<Vec<Plan>, ApiError> {
            self.check_failure()?;
            Ok(self.plans.borrow().values().cloned().collect())
        }

        fn get_plan(&self, id: i64) -> Result<Plan, ApiError> {
            self.check_failure()?;
            self.plans
                .borrow()
                .get(&id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("plan {}", id)))
        }

        fn create_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
            self.check_failure()?;
            let id = self.next_id.replace(self.next_id.get() + 1);
            let mut saved = plan.clone();
            saved.id = Some(id);
            self.plans.borrow_mut().insert(id, saved.clone());
            Ok(saved)
        }

        fn update_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
            self.check_failure()?;
            let id = plan.id.unwrap();
            let mut plans = self.plans.borrow_mut();
            if !plans.contains_key(&id) {
                return Err(ApiError::NotFound(format!("plan {}", id)));
            }
            plans.insert(id, plan.clone());
            Ok(plan.clone())
        }

        fn patch_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
            self.check_failure()?;
            let id = plan.id.unwrap();
            let mut plans = self.plans.borrow_mut();
            let existing = plans
                .get_mut(&id)
                .ok_or_else(|| ApiError::NotFound(format!("plan {}", id)))?;
            if let Some(label) = &plan.plan {
                existing.plan = Some(label.clone());
            }
            if let Some(deductible) = plan.deductible {
                existing.deductible = Some(deductible);
            }
            if let Some(co_pay) = plan.co_pay {
                existing.co_pay = Some(co_pay);
            }
            if let Some(user) = &plan.user {
                existing.user = Some(user.clone());
            }
            Ok(existing.clone())
        }

        fn delete_plan(&self, id: i64) -> Result<(), ApiError> {
            self.check_failure()?;
            self.plans
                .borrow_mut()
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| ApiError::NotFound(format!("plan {}", id)))
        }

        fn list_users(&self) -> Result<Vec<UserRef>, ApiError> {
            self.check_failure()?;
            Ok(self.users.clone())
        }
    }

    fn gold_draft() -> Plan {
        Plan {
            id: None,
            plan: Some("Gold".to_string()),
            deductible: Some(500),
            co_pay: Some(20.0),
            user: Some(UserRef::by_id(1)),
        }
    }

    fn store() -> PlanStore<MockApi> {
        PlanStore::new(MockApi::new())
    }

    #[test]
    fn test_create_assigns_server_id() {
        let mut store = store();
        let outcome = store.create(gold_draft()).unwrap();
        match outcome {
            SaveOutcome::Created(plan) => assert_eq!(plan.id, Some(7)),
            other => panic!("expected Created, got {:?}", other),
        }
        assert_eq!(store.state().entity.id, Some(7));
        assert!(store.state().update_success);
        assert!(!store.state().updating);
    }

    #[test]
    fn test_create_then_fetch_all_contains_record_once() {
        let mut store = store();
        store.create(gold_draft()).unwrap();
        let plans = store.fetch_all().unwrap();
        let matches = plans.iter().filter(|p| p.id == Some(7)).count();
        assert_eq!(matches, 1);
    }

    #[test]
    fn test_create_rejects_preset_id() {
        let mut store = store();
        let mut draft = gold_draft();
        draft.id = Some(99);
        match store.create(draft) {
            Err(ApiError::Validation(errors)) => assert_eq!(errors[0].field, "id"),
            other => panic!("expected Validation, got {:?}", other.map(|_| ())),
        }
        // nothing was sent
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_missing_fields_before_sending() {
        let mut store = store();
        match store.create(Plan::default()) {
            Err(ApiError::Validation(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected Validation, got {:?}", other.map(|_| ())),
        }
        assert!(!store.state().updating);
        assert!(!store.state().update_success);
    }

    #[test]
    fn test_update_changes_fields_and_keeps_id() {
        let mut store = store();
        store.create(gold_draft()).unwrap();

        let mut changed = store.state().entity.clone();
        changed.plan = Some("Platinum".to_string());
        changed.deductible = Some(250);
        let outcome = store.update(changed).unwrap();

        let plan = outcome.plan().unwrap();
        assert_eq!(plan.id, Some(7));
        assert_eq!(plan.plan.as_deref(), Some("Platinum"));
        assert_eq!(store.state().entity.deductible, Some(250));
        assert!(store.state().update_success);
    }

    #[test]
    fn test_update_without_id_is_rejected() {
        let mut store = store();
        match store.update(gold_draft()) {
            Err(ApiError::Validation(errors)) => assert_eq!(errors[0].field, "id"),
            other => panic!("expected Validation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_partial_update_merges_only_given_fields() {
        let mut store = store();
        store.create(gold_draft()).unwrap();

        let patch = Plan {
            id: Some(7),
            deductible: Some(1000),
            ..Plan::default()
        };
        let outcome = store.partial_update(patch).unwrap();

        let plan = outcome.plan().unwrap();
        assert_eq!(plan.deductible, Some(1000));
        assert_eq!(plan.plan.as_deref(), Some("Gold"));
        assert_eq!(plan.co_pay, Some(20.0));
    }

    #[test]
    fn test_delete_removes_record_from_subsequent_fetch() {
        let mut store = store();
        store.create(gold_draft()).unwrap();

        let outcome = store.delete(7).unwrap();
        assert_eq!(outcome, SaveOutcome::Deleted(7));
        assert!(store.state().update_success);
        assert_eq!(store.state().entity, Plan::default());

        let plans = store.fetch_all().unwrap();
        assert!(plans.iter().all(|p| p.id != Some(7)));
    }

    #[test]
    fn test_fetch_one_not_found_leaves_entity_unchanged() {
        let mut store = store();
        store.create(gold_draft()).unwrap();
        store.fetch_one(7).unwrap();

        match store.fetch_one(42) {
            Err(ApiError::NotFound(what)) => assert_eq!(what, "plan 42"),
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
        assert_eq!(store.state().entity.id, Some(7));
        assert!(!store.state().loading);
    }

    #[test]
    fn test_fetch_all_empty_collection_clears_loading() {
        let mut store = store();
        let plans = store.fetch_all().unwrap();
        assert!(plans.is_empty());
        assert!(!store.state().loading);
    }

    #[test]
    fn test_fetch_failure_clears_loading_and_keeps_entities() {
        let mut store = store();
        store.create(gold_draft()).unwrap();
        store.fetch_all().unwrap();

        store.api.fail_next.set(true);
        match store.fetch_all() {
            Err(ApiError::Network(_)) => {}
            other => panic!("expected Network, got {:?}", other.map(|_| ())),
        }
        assert!(!store.state().loading);
        assert_eq!(store.state().entities.len(), 1);
    }

    #[test]
    fn test_write_failure_clears_updating() {
        let mut store = store();
        store.api.fail_next.set(true);
        assert!(store.create(gold_draft()).is_err());
        assert!(!store.state().updating);
        assert!(!store.state().update_success);
    }

    #[test]
    fn test_update_success_cleared_when_next_request_starts() {
        let mut store = store();
        store.create(gold_draft()).unwrap();
        assert!(store.state().update_success);

        store.fetch_all().unwrap();
        assert!(!store.state().update_success);
    }

    #[test]
    fn test_reset_restores_empty_draft() {
        let mut store = store();
        store.create(gold_draft()).unwrap();
        assert!(store.state().update_success);

        store.reset();
        assert_eq!(store.state().entity, Plan::default());
        assert!(!store.state().update_success);
    }

    #[test]
    fn test_fetch_users_populates_selection_list() {
        let mut store = store();
        let users = store.fetch_users().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].login.as_deref(), Some("admin"));
    }

    #[test]
    fn test_stale_list_response_is_discarded() {
        let mut state = State::default();
        let first = state.read_started(Slot::List);
        let second = state.read_started(Slot::List);

        let newer = vec![Plan {
            id: Some(2),
            ..Plan::default()
        }];
        assert!(state.list_loaded(second, newer));
        assert!(!state.loading);

        // the older request completes after the newer one
        let stale = vec![Plan {
            id: Some(1),
            ..Plan::default()
        }];
        assert!(!state.list_loaded(first, stale));
        assert_eq!(state.entities[0].id, Some(2));
    }

    #[test]
    fn test_stale_read_failure_keeps_loading_for_newer_request() {
        let mut state = State::default();
        let first = state.read_started(Slot::Entity);
        let _second = state.read_started(Slot::Entity);

        state.read_failed(first);
        assert!(state.loading);
    }

    #[test]
    fn test_entity_read_completing_after_write_is_discarded() {
        let mut state = State::default();
        let token = state.read_started(Slot::Entity);

        let saved = Plan {
            id: Some(7),
            plan: Some("Gold".to_string()),
            ..Plan::default()
        };
        state.write_succeeded(Some(saved));

        let old = Plan {
            id: Some(7),
            plan: Some("Silver".to_string()),
            ..Plan::default()
        };
        assert!(!state.entity_loaded(token, old));
        assert_eq!(state.entity.plan.as_deref(), Some("Gold"));
    }

    #[test]
    fn test_token_for_one_slot_cannot_complete_another() {
        let mut state = State::default();
        let token = state.read_started(Slot::List);
        assert!(!state.entity_loaded(token, Plan::default()));
    }
}
