use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, instrument};

use crate::presentation::api::DirectoryApi;
use crate::presentation::debounce::{Debouncer, DEFAULT_QUIET_PERIOD};
use crate::presentation::state::{reduce, Action, Command, UiEvent, ViewState};
use crate::users::dto::CreateUserRequest;

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub page_size: u32,
    pub quiet_period: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

#[derive(Debug, Error)]
#[error("directory controller has stopped")]
pub struct ControllerStopped;

/// Front end of a running controller: send UI events, read snapshots.
/// Dropping every handle stops the controller task.
#[derive(Clone)]
pub struct DirectoryHandle {
    events: mpsc::Sender<UiEvent>,
    state: watch::Receiver<ViewState>,
}

impl DirectoryHandle {
    pub async fn dispatch(&self, event: UiEvent) -> Result<(), ControllerStopped> {
        self.events.send(event).await.map_err(|_| ControllerStopped)
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }
}

/// Starts the controller task and issues the initial listing call.
pub fn spawn<A: DirectoryApi>(api: Arc<A>, config: ControllerConfig) -> DirectoryHandle {
    let initial = ViewState::new(config.page_size);
    let (events_tx, events_rx) = mpsc::channel(64);
    let (state_tx, state_rx) = watch::channel(initial.clone());
    tokio::spawn(run(api, config, initial, events_rx, state_tx));

    let handle = DirectoryHandle {
        events: events_tx,
        state: state_rx,
    };
    if handle.events.try_send(UiEvent::Refresh).is_err() {
        debug!("initial refresh not queued");
    }
    handle
}

async fn run<A: DirectoryApi>(
    api: Arc<A>,
    config: ControllerConfig,
    mut state: ViewState,
    mut events: mpsc::Receiver<UiEvent>,
    published: watch::Sender<ViewState>,
) {
    let (debouncer, mut settled) = Debouncer::spawn(config.quiet_period);
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Action>();

    loop {
        let action = tokio::select! {
            event = events.recv() => match event {
                Some(event) => Action::Ui(event),
                None => break,
            },
            Some(term) = settled.recv() => Action::SearchSettled(term),
            Some(done) = done_rx.recv() => done,
        };

        let transition = reduce(&state, action);
        state = transition.state;
        for command in transition.commands {
            execute(&api, &debouncer, &done_tx, command);
        }
        published.send_replace(state.clone());
    }
    debug!("directory controller stopped");
}

#[instrument(skip(api, debouncer, done))]
fn execute<A: DirectoryApi>(
    api: &Arc<A>,
    debouncer: &Debouncer<String>,
    done: &mpsc::UnboundedSender<Action>,
    command: Command,
) {
    match command {
        Command::Debounce(term) => debouncer.push(term),
        Command::Fetch(req) => {
            let api = Arc::clone(api);
            let done = done.clone();
            tokio::spawn(async move {
                let result = api.list(req.page, req.limit, &req.search).await;
                report(&done, Action::FetchCompleted { seq: req.seq, result });
            });
        }
        Command::Create { email, name } => {
            let api = Arc::clone(api);
            let done = done.clone();
            tokio::spawn(async move {
                let request = CreateUserRequest {
                    email: Some(email),
                    name,
                };
                report(&done, Action::CreateCompleted(api.create(request).await));
            });
        }
        Command::Delete(id) => {
            let api = Arc::clone(api);
            let done = done.clone();
            tokio::spawn(async move {
                report(&done, Action::DeleteCompleted(api.delete(id).await));
            });
        }
    }
}

fn report(done: &mpsc::UnboundedSender<Action>, action: Action) {
    if done.send(action).is_err() {
        debug!("directory controller stopped, dropping result");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::config::ListingConfig;
    use crate::presentation::api::{HttpDirectory, LocalDirectory, RemoteError};
    use crate::presentation::state::{CREATED, DELETED, DELETE_FAILED, FETCH_UNREACHABLE};
    use crate::users::{dto::UserListing, memory::MemoryUserStore, repo_types::User};

    /// LocalDirectory with per-search latency and a log of listing calls.
    struct ScriptedApi {
        inner: LocalDirectory,
        latency: HashMap<String, Duration>,
        calls: Mutex<Vec<(u32, String)>>,
    }

    impl ScriptedApi {
        fn new(latency: &[(&str, u64)]) -> Self {
            Self {
                inner: LocalDirectory::new(
                    Arc::new(MemoryUserStore::new()),
                    ListingConfig::default(),
                ),
                latency: latency
                    .iter()
                    .map(|(k, ms)| (k.to_string(), Duration::from_millis(*ms)))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(u32, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DirectoryApi for ScriptedApi {
        async fn list(
            &self,
            page: u32,
            limit: u32,
            search: &str,
        ) -> Result<UserListing, RemoteError> {
            self.calls.lock().unwrap().push((page, search.to_string()));
            if let Some(delay) = self.latency.get(search) {
                tokio::time::sleep(*delay).await;
            }
            self.inner.list(page, limit, search).await
        }

        async fn create(&self, request: CreateUserRequest) -> Result<User, RemoteError> {
            self.inner.create(request).await
        }

        async fn delete(&self, id: i64) -> Result<User, RemoteError> {
            self.inner.delete(id).await
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    async fn create(handle: &DirectoryHandle, email: &str, name: &str) {
        handle
            .dispatch(UiEvent::CreateRequested {
                email: email.into(),
                name: Some(name.into()),
            })
            .await
            .unwrap();
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn initial_load_and_create_refreshes_view() {
        let api = Arc::new(ScriptedApi::new(&[]));
        let handle = spawn(api.clone(), ControllerConfig::default());
        settle().await;
        assert_eq!(api.calls(), vec![(1, String::new())]);
        assert!(!handle.snapshot().loading);

        create(&handle, "a@example.com", "Alice").await;
        let view = handle.snapshot();
        assert_eq!(view.status_message.as_deref(), Some(CREATED));
        assert_eq!(view.users.len(), 1);
        assert_eq!(view.total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_create_reports_server_message() {
        let api = Arc::new(ScriptedApi::new(&[]));
        let handle = spawn(api, ControllerConfig::default());
        create(&handle, "a@example.com", "Alice").await;
        create(&handle, "a@example.com", "Again").await;
        assert_eq!(
            handle.snapshot().status_message.as_deref(),
            Some("Failed to create user: User with this email already exists")
        );
        assert_eq!(handle.snapshot().total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_burst_issues_one_search_from_page_one() {
        let api = Arc::new(ScriptedApi::new(&[]));
        let handle = spawn(api.clone(), ControllerConfig::default());
        for i in 0..7 {
            create(&handle, &format!("user{i}@example.com"), &format!("User {i}")).await;
        }
        handle.dispatch(UiEvent::PageChanged(2)).await.unwrap();
        settle().await;
        assert_eq!(handle.snapshot().current_page, 2);

        let before = api.calls().len();
        for term in ["u", "us", "use", "user", "user3"] {
            handle
                .dispatch(UiEvent::SearchInput(term.into()))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        settle().await;

        let calls = api.calls();
        assert_eq!(&calls[before..], &[(1, "user3".to_string())]);
        let view = handle.snapshot();
        assert_eq!(view.current_page, 1);
        assert_eq!(view.total, 1);
        assert_eq!(view.users[0].email, "user3@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_response_does_not_overwrite_newer_one() {
        // the unfiltered listing is slow, the search is fast
        let api = Arc::new(ScriptedApi::new(&[("", 3_000)]));
        let handle = spawn(api.clone(), ControllerConfig::default());
        settle().await;
        for i in 0..3 {
            create(&handle, &format!("user{i}@example.com"), &format!("User {i}")).await;
        }

        handle.dispatch(UiEvent::PageChanged(1)).await.unwrap();
        handle
            .dispatch(UiEvent::SearchInput("user2".into()))
            .await
            .unwrap();
        settle().await;

        let view = handle.snapshot();
        assert_eq!(view.search_term, "user2");
        assert_eq!(view.total, 1);
        assert_eq!(view.users[0].email, "user2@example.com");
        assert!(!view.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_refreshes_and_second_delete_fails() {
        let api = Arc::new(ScriptedApi::new(&[]));
        let handle = spawn(api, ControllerConfig::default());
        create(&handle, "a@example.com", "Alice").await;
        let id = handle.snapshot().users[0].id;

        handle.dispatch(UiEvent::DeleteRequested(id)).await.unwrap();
        settle().await;
        let view = handle.snapshot();
        assert_eq!(view.status_message.as_deref(), Some(DELETED));
        assert!(view.users.is_empty());

        handle.dispatch(UiEvent::DeleteRequested(id)).await.unwrap();
        settle().await;
        assert_eq!(handle.snapshot().status_message.as_deref(), Some(DELETE_FAILED));
    }

    #[tokio::test(start_paused = true)]
    async fn result_after_stop_is_dropped() {
        let api = Arc::new(ScriptedApi::new(&[("", 3_000)]));
        let handle = spawn(api.clone(), ControllerConfig::default());
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(handle);
        settle().await;
        assert_eq!(api.calls(), vec![(1, String::new())]);
    }

    async fn wait_until(handle: &DirectoryHandle, done: impl FnMut(&ViewState) -> bool) -> ViewState {
        let mut rx = handle.subscribe();
        let view = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
            .await
            .expect("view did not settle")
            .unwrap()
            .clone();
        view
    }

    fn fast() -> ControllerConfig {
        ControllerConfig {
            page_size: 5,
            quiet_period: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn drives_a_running_server_over_http() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::app::build_app(crate::state::AppState::in_memory());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let api = HttpDirectory::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let handle = spawn(Arc::new(api), fast());
        wait_until(&handle, |v| v.latest_request == 1 && !v.loading).await;

        handle
            .dispatch(UiEvent::CreateRequested {
                email: "a@example.com".into(),
                name: Some("Alice".into()),
            })
            .await
            .unwrap();
        let view = wait_until(&handle, |v| v.total == 1 && !v.loading).await;
        assert_eq!(view.status_message.as_deref(), Some(CREATED));
        assert_eq!(view.users[0].email, "a@example.com");
    }

    #[tokio::test]
    async fn unreachable_server_reports_fetch_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpDirectory::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let handle = spawn(Arc::new(api), fast());
        let view = wait_until(&handle, |v| !v.loading && v.latest_request == 1).await;
        assert_eq!(view.status_message.as_deref(), Some(FETCH_UNREACHABLE));
        assert!(view.users.is_empty());
    }
}
