use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use taskflow_core::{
    AccountDirectory, Advisor, Collection, CompletionCapability, CompletionError,
    CompletionRequest, ErrorKind, MemoryRecordStore, Record, RecordStore, SessionController,
    SessionError, StoreError, StoreResult, TaskPatch, TaskRepository, TaskStatus,
    PRIORITIZE_FALLBACK,
};
use uuid::Uuid;

/// Pops one scripted reply per call; fails once the script runs out.
#[derive(Default)]
struct ScriptedCompletion {
    replies: RefCell<VecDeque<Result<String, CompletionError>>>,
}

impl ScriptedCompletion {
    fn push_text(&self, text: &str) {
        self.replies.borrow_mut().push_back(Ok(text.to_string()));
    }

    fn push_failure(&self) {
        self.replies
            .borrow_mut()
            .push_back(Err(CompletionError::Provider("quota exceeded".to_string())));
    }
}

impl CompletionCapability for ScriptedCompletion {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Transport("no scripted reply".to_string())))
    }
}

/// Memory store whose `tasks` reads start failing after a set number of
/// further successful reads.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryRecordStore,
    armed: AtomicBool,
    reads_left: AtomicUsize,
}

impl FlakyStore {
    fn fail_task_reads_after(&self, reads: usize) {
        self.reads_left.store(reads, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    fn heal(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    fn task_read_fails(&self) -> bool {
        if !self.armed.load(Ordering::SeqCst) {
            return false;
        }
        self.reads_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_err()
    }
}

impl RecordStore for FlakyStore {
    fn read(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        if collection == Collection::Tasks && self.task_read_fails() {
            return Err(StoreError::InvalidData {
                collection,
                message: "disk unavailable".to_string(),
            });
        }
        self.inner.read(collection)
    }

    fn write(&self, collection: Collection, records: &[Record]) -> StoreResult<()> {
        self.inner.write(collection, records)
    }
}

type FlakyController = SessionController<Arc<FlakyStore>, Arc<ScriptedCompletion>>;

fn flaky_signed_in() -> (Arc<FlakyStore>, FlakyController) {
    let store = Arc::new(FlakyStore::default());
    let mut controller = SessionController::new(
        AccountDirectory::new(Arc::clone(&store)),
        TaskRepository::new(Arc::clone(&store)),
        Advisor::new(Arc::new(ScriptedCompletion::default())),
    );
    controller.register("Ada", "ada@x.com", "pw").unwrap();
    (store, controller)
}

type Controller = SessionController<Arc<MemoryRecordStore>, Arc<ScriptedCompletion>>;

fn controller_on(store: &Arc<MemoryRecordStore>, ai: &Arc<ScriptedCompletion>) -> Controller {
    SessionController::new(
        AccountDirectory::new(Arc::clone(store)),
        TaskRepository::new(Arc::clone(store)),
        Advisor::new(Arc::clone(ai)),
    )
}

fn setup() -> (Arc<MemoryRecordStore>, Arc<ScriptedCompletion>, Controller) {
    let store = Arc::new(MemoryRecordStore::new());
    let ai = Arc::new(ScriptedCompletion::default());
    let controller = controller_on(&store, &ai);
    (store, ai, controller)
}

fn signed_in() -> (Arc<MemoryRecordStore>, Arc<ScriptedCompletion>, Controller) {
    let (store, ai, mut controller) = setup();
    controller.register("Ada", "ada@x.com", "pw").unwrap();
    (store, ai, controller)
}

#[test]
fn bootstrap_without_session_is_signed_out() {
    let (_store, _ai, mut controller) = setup();
    controller.bootstrap().unwrap();

    assert!(controller.account().is_none());
    assert!(controller.tasks().is_empty());
    assert!(!controller.tasks_are_stale());
}

#[test]
fn bootstrap_restores_persisted_session() {
    let (store, ai, mut first) = setup();
    let account = first.register("Ada", "ada@x.com", "pw").unwrap();
    first.create_task("Carry over", "").unwrap();

    let mut second = controller_on(&store, &ai);
    second.bootstrap().unwrap();
    assert_eq!(second.account(), Some(&account));
    assert_eq!(second.tasks().len(), 1);
}

#[test]
fn register_signs_in_and_loads_empty_task_list() {
    let (_store, _ai, mut controller) = setup();
    let account = controller.register("Ada", "ada@x.com", "pw").unwrap();

    assert_eq!(controller.account(), Some(&account));
    assert!(controller.tasks().is_empty());
}

#[test]
fn failed_login_keeps_existing_state() {
    let (_store, _ai, mut controller) = signed_in();
    controller.create_task("Existing", "").unwrap();
    let account = controller.account().cloned();

    let err = controller.login("nobody@x.com", "pw").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    assert_eq!(controller.account().cloned(), account);
    assert_eq!(controller.tasks().len(), 1);
}

#[test]
fn duplicate_registration_surfaces_duplicate_account() {
    let (_store, _ai, mut controller) = signed_in();
    let err = controller.register("Again", "ada@x.com", "pw").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateAccount);
}

#[test]
fn mutations_refetch_cache_in_store_order() {
    let (_store, _ai, mut controller) = signed_in();
    controller.create_task("T1", "").unwrap();
    controller.create_task("T2", "").unwrap();
    let third = controller.create_task("T3", "details").unwrap();

    let titles: Vec<&str> = controller.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["T3", "T2", "T1"]);

    controller.toggle_task(third.id).unwrap();
    assert_eq!(controller.tasks()[0].status, TaskStatus::Completed);
    assert_eq!(controller.completed_tasks().count(), 1);
    assert_eq!(controller.pending_tasks().count(), 2);

    controller.toggle_task(third.id).unwrap();
    assert_eq!(controller.tasks()[0].status, TaskStatus::Pending);
    assert_eq!(controller.tasks()[0].description.as_deref(), Some("details"));

    controller.delete_task(third.id).unwrap();
    assert_eq!(controller.tasks().len(), 2);
}

#[test]
fn create_with_blank_title_fails_before_repository() {
    let (_store, _ai, mut controller) = signed_in();
    let err = controller.create_task("  ", "desc").unwrap_err();

    assert!(matches!(err, SessionError::Validation(_)));
    assert!(controller.tasks().is_empty());
}

#[test]
fn task_operations_require_sign_in() {
    let (_store, _ai, mut controller) = setup();
    controller.bootstrap().unwrap();

    let err = controller.create_task("title", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    let err = controller.delete_task(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
}

#[test]
fn update_of_unknown_task_is_not_found_and_cache_kept() {
    let (_store, _ai, mut controller) = signed_in();
    controller.create_task("Existing", "").unwrap();

    let err = controller
        .update_task(Uuid::new_v4(), &TaskPatch::status(TaskStatus::Completed))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(controller.tasks().len(), 1);
    assert!(!controller.tasks_are_stale());
}

#[test]
fn delete_of_unknown_task_succeeds() {
    let (_store, _ai, mut controller) = signed_in();
    controller.create_task("Existing", "").unwrap();
    controller.delete_task(Uuid::new_v4()).unwrap();
    assert_eq!(controller.tasks().len(), 1);
}

#[test]
fn logout_clears_account_tasks_draft_and_insight() {
    let (_store, ai, mut controller) = signed_in();
    controller.create_task("Mine", "").unwrap();
    ai.push_text("Focus on Mine.");
    controller.prioritize().unwrap();
    controller.open_new_task();

    controller.logout().unwrap();
    assert!(controller.account().is_none());
    assert!(controller.tasks().is_empty());
    assert!(controller.editor().is_none());
    assert!(controller.insight().is_none());
}

#[test]
fn switching_accounts_shows_only_own_tasks() {
    let (_store, _ai, mut controller) = signed_in();
    controller.create_task("Ada's task", "").unwrap();
    controller.logout().unwrap();

    controller.register("Bob", "bob@x.com", "pw").unwrap();
    assert!(controller.tasks().is_empty());
    controller.create_task("Bob's task", "").unwrap();

    controller.login("ada@x.com", "pw").unwrap();
    let titles: Vec<&str> = controller.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Ada's task"]);
}

#[test]
fn new_task_draft_with_suggestions_saves_as_task() {
    let (_store, ai, mut controller) = signed_in();
    controller.open_new_task();
    controller.set_draft_title("Launch website").unwrap();
    ai.push_text(r#"["Buy domain","Configure DNS"]"#);

    let suggestions = controller.suggest_subtasks().unwrap().to_vec();
    assert_eq!(suggestions, vec!["Buy domain", "Configure DNS"]);

    controller.accept_suggestion(1).unwrap();
    controller.accept_suggestion(0).unwrap();
    let draft = controller.editor().unwrap();
    assert_eq!(draft.description(), "- Configure DNS\n- Buy domain");
    assert!(draft.suggestions().is_empty());

    let task = controller.save_editor().unwrap();
    assert!(controller.editor().is_none());
    assert_eq!(task.title, "Launch website");
    assert_eq!(controller.tasks(), &[task][..]);
}

#[test]
fn accepted_suggestion_appends_to_existing_description() {
    let (_store, ai, mut controller) = signed_in();
    controller.open_new_task();
    controller.set_draft_title("Trip").unwrap();
    controller.set_draft_description("Summer").unwrap();
    ai.push_text(r#"["Book flights"]"#);
    controller.suggest_subtasks().unwrap();

    controller.accept_suggestion(0).unwrap();
    assert_eq!(controller.editor().unwrap().description(), "Summer\n- Book flights");

    let err = controller.accept_suggestion(0).unwrap_err();
    assert!(matches!(err, SessionError::SuggestionOutOfRange(0)));
}

#[test]
fn suggest_requires_title_and_open_editor() {
    let (_store, _ai, mut controller) = signed_in();
    let err = controller.suggest_subtasks().unwrap_err();
    assert!(matches!(err, SessionError::NoActiveEditor));

    controller.open_new_task();
    let err = controller.suggest_subtasks().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn suggest_failure_is_ai_unavailable_and_keeps_previous_suggestions() {
    let (_store, ai, mut controller) = signed_in();
    controller.open_new_task();
    controller.set_draft_title("Plan").unwrap();
    ai.push_text(r#"["Step one"]"#);
    controller.suggest_subtasks().unwrap();

    ai.push_failure();
    let err = controller.suggest_subtasks().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AiUnavailable);
    assert_eq!(controller.editor().unwrap().suggestions(), ["Step one"]);
}

#[test]
fn opening_another_draft_discards_previous_one() {
    let (_store, ai, mut controller) = signed_in();
    let existing = controller.create_task("Existing", "notes").unwrap();

    controller.open_new_task();
    controller.set_draft_title("Unsaved").unwrap();
    ai.push_text(r#"["a","b"]"#);
    controller.suggest_subtasks().unwrap();

    let draft = controller.open_task_editor(existing.id).unwrap();
    assert_eq!(draft.task_id(), Some(existing.id));
    assert_eq!(draft.title(), "Existing");
    assert_eq!(draft.description(), "notes");
    assert!(draft.suggestions().is_empty());
}

#[test]
fn editing_existing_task_updates_in_place() {
    let (_store, _ai, mut controller) = signed_in();
    let task = controller.create_task("Draft", "old").unwrap();
    controller.create_task("Newer", "").unwrap();

    controller.open_task_editor(task.id).unwrap();
    controller.set_draft_title("Final").unwrap();
    controller.set_draft_description("").unwrap();
    let saved = controller.save_editor().unwrap();

    assert_eq!(saved.id, task.id);
    assert_eq!(saved.created_at, task.created_at);
    assert!(saved.description.is_none());
    assert_eq!(controller.tasks()[1].title, "Final");
}

#[test]
fn failed_save_keeps_draft_open() {
    let (_store, _ai, mut controller) = signed_in();
    controller.open_new_task();
    controller.set_draft_description("no title yet").unwrap();

    let err = controller.save_editor().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(controller.editor().unwrap().description(), "no title yet");
}

#[test]
fn deleting_edited_task_closes_editor() {
    let (_store, _ai, mut controller) = signed_in();
    let task = controller.create_task("Doomed", "").unwrap();
    controller.open_task_editor(task.id).unwrap();

    controller.delete_task(task.id).unwrap();
    assert!(controller.editor().is_none());
}

#[test]
fn prioritize_stores_insight_and_falls_back_on_empty_text() {
    let (_store, ai, mut controller) = signed_in();
    controller.create_task("Report", "").unwrap();

    ai.push_text("Do the report first.");
    assert_eq!(controller.prioritize().unwrap(), "Do the report first.");
    assert_eq!(controller.insight(), Some("Do the report first."));

    ai.push_text("");
    assert_eq!(controller.prioritize().unwrap(), PRIORITIZE_FALLBACK);

    controller.dismiss_insight();
    assert!(controller.insight().is_none());
}

#[test]
fn prioritize_failure_is_ai_unavailable_and_keeps_previous_insight() {
    let (_store, ai, mut controller) = signed_in();
    ai.push_text("Rest today.");
    controller.prioritize().unwrap();

    ai.push_failure();
    let err = controller.prioritize().unwrap_err();
    assert!(matches!(err, SessionError::Advisor(_)));
    assert_eq!(err.kind(), ErrorKind::AiUnavailable);
    assert_eq!(controller.insight(), Some("Rest today."));
}

#[test]
fn mutations_reload_tasks_written_by_another_handle() {
    let (store, _ai, mut controller) = signed_in();
    let owner = controller.account().unwrap().id;
    let other_handle = TaskRepository::new(Arc::clone(&store));
    let outside = other_handle.create(owner, "Written elsewhere", None).unwrap();
    assert!(controller.tasks().is_empty());

    controller.create_task("Mine", "").unwrap();
    let titles: Vec<&str> = controller.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Mine", "Written elsewhere"]);

    other_handle.delete(owner, outside.id).unwrap();
    controller.delete_task(Uuid::new_v4()).unwrap();
    let titles: Vec<&str> = controller.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Mine"]);
}

#[test]
fn failed_reload_after_create_reports_success_and_leaves_cache_stale() {
    let (store, mut controller) = flaky_signed_in();
    controller.create_task("one", "").unwrap();
    let account = controller.account().cloned();

    store.fail_task_reads_after(1);
    let two = controller.create_task("two", "").unwrap();
    assert_eq!(two.title, "two");
    assert!(controller.tasks_are_stale());
    assert!(controller.tasks().is_empty());
    assert_eq!(controller.account().cloned(), account);

    store.heal();
    controller.refresh_tasks().unwrap();
    let titles: Vec<&str> = controller.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["two", "one"]);
}

#[test]
fn toggle_and_open_editor_reload_stale_cache_before_lookup() {
    let (store, mut controller) = flaky_signed_in();
    let one = controller.create_task("one", "notes").unwrap();

    store.fail_task_reads_after(1);
    controller.create_task("two", "").unwrap();
    assert!(controller.tasks_are_stale());

    let err = controller.toggle_task(one.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    store.heal();
    let toggled = controller.toggle_task(one.id).unwrap();
    assert_eq!(toggled.status, TaskStatus::Completed);
    assert!(!controller.tasks_are_stale());

    store.fail_task_reads_after(1);
    controller.create_task("three", "").unwrap();
    assert!(controller.tasks_are_stale());
    store.heal();
    let draft = controller.open_task_editor(one.id).unwrap();
    assert_eq!(draft.title(), "one");
    assert_eq!(draft.description(), "notes");
    assert_eq!(controller.tasks().len(), 3);
}
