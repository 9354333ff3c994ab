//! Client view state and its reducer.
//!
//! `reduce` is pure: it never performs I/O, it returns the next state plus
//! the commands the controller should run.

use crate::presentation::api::RemoteError;
use crate::users::{dto::UserListing, repo_types::User};

pub const CREATED: &str = "User created successfully!";
pub const CREATE_UNREACHABLE: &str = "Error creating user";
pub const DELETED: &str = "User deleted successfully!";
pub const DELETE_FAILED: &str = "Failed to delete user";
pub const DELETE_UNREACHABLE: &str = "Error deleting user";
pub const FETCH_UNREACHABLE: &str = "Error fetching users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub current_page: u32,
    pub page_size: u32,
    pub search_term: String,
    pub status_message: Option<String>,
    pub users: Vec<User>,
    pub total: i64,
    pub total_pages: i64,
    pub loading: bool,
    /// Sequence number of the most recently issued listing call.
    pub latest_request: u64,
}

impl ViewState {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            search_term: String::new(),
            status_message: None,
            users: Vec::new(),
            total: 0,
            total_pages: 0,
            loading: false,
            latest_request: 0,
        }
    }
}

/// Things the user does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Refresh,
    SearchInput(String),
    PageChanged(u32),
    CreateRequested { email: String, name: Option<String> },
    DeleteRequested(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Ui(UiEvent),
    /// The debouncer saw no new input for a full quiet period.
    SearchSettled(String),
    FetchCompleted {
        seq: u64,
        result: Result<UserListing, RemoteError>,
    },
    CreateCompleted(Result<User, RemoteError>),
    DeleteCompleted(Result<User, RemoteError>),
}

impl From<UiEvent> for Action {
    fn from(event: UiEvent) -> Self {
        Action::Ui(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fetch(FetchRequest),
    Debounce(String),
    Create { email: String, name: Option<String> },
    Delete(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ViewState,
    pub commands: Vec<Command>,
}

impl Transition {
    fn quiet(state: ViewState) -> Self {
        Self {
            state,
            commands: Vec::new(),
        }
    }
}

pub fn reduce(state: &ViewState, action: Action) -> Transition {
    let mut next = state.clone();
    match action {
        Action::Ui(UiEvent::Refresh) => fetch_current(next),
        Action::Ui(UiEvent::SearchInput(term)) => {
            next.search_term = term.clone();
            Transition {
                state: next,
                commands: vec![Command::Debounce(term)],
            }
        }
        Action::SearchSettled(term) => {
            // a settle for a term the user has since edited away is outdated
            if term != next.search_term {
                return Transition::quiet(next);
            }
            next.current_page = 1;
            fetch_current(next)
        }
        Action::Ui(UiEvent::PageChanged(page)) => {
            next.current_page = page.max(1);
            fetch_current(next)
        }
        Action::Ui(UiEvent::CreateRequested { email, name }) => Transition {
            state: next,
            commands: vec![Command::Create { email, name }],
        },
        Action::Ui(UiEvent::DeleteRequested(id)) => Transition {
            state: next,
            commands: vec![Command::Delete(id)],
        },
        Action::FetchCompleted { seq, result } => {
            if seq != next.latest_request {
                return Transition::quiet(next);
            }
            next.loading = false;
            match result {
                Ok(listing) => {
                    next.users = listing.users;
                    next.total = listing.total;
                    next.total_pages = listing.total_pages;
                }
                Err(RemoteError::Rejected(message)) => next.status_message = Some(message),
                Err(RemoteError::Unreachable(_)) => {
                    next.status_message = Some(FETCH_UNREACHABLE.into())
                }
            }
            Transition::quiet(next)
        }
        Action::CreateCompleted(result) => {
            next.status_message = Some(match result {
                Ok(_) => CREATED.into(),
                Err(RemoteError::Rejected(message)) => format!("Failed to create user: {message}"),
                Err(RemoteError::Unreachable(_)) => CREATE_UNREACHABLE.into(),
            });
            fetch_current(next)
        }
        Action::DeleteCompleted(result) => {
            next.status_message = Some(match result {
                Ok(_) => DELETED.into(),
                Err(RemoteError::Rejected(_)) => DELETE_FAILED.into(),
                Err(RemoteError::Unreachable(_)) => DELETE_UNREACHABLE.into(),
            });
            fetch_current(next)
        }
    }
}

fn fetch_current(mut next: ViewState) -> Transition {
    next.latest_request += 1;
    next.loading = true;
    let request = FetchRequest {
        seq: next.latest_request,
        page: next.current_page,
        limit: next.page_size,
        search: next.search_term.clone(),
    };
    Transition {
        state: next,
        commands: vec![Command::Fetch(request)],
    }
}
