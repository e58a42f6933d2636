use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use super::StoreError;
use crate::gateway::GatewayError;
use crate::models::{EntityId, LoginForm, RegisterForm, User, UserForm};
use crate::services::AuthService;
use crate::session::Session;

const LOGIN_FAILED: &str = "로그인에 실패했습니다";
const REGISTER_FAILED: &str = "회원가입에 실패했습니다";
const LOGOUT_FAILED: &str = "로그아웃에 실패했습니다";
const LOAD_FAILED: &str = "사용자 정보를 가져오는데 실패했습니다";
const UPDATE_FAILED: &str = "사용자 정보 수정에 실패했습니다";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub user: Option<User>,
    pub authenticated: bool,
    pub in_flight: usize,
    pub error: Option<StoreError>,
}

impl UserState {
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }
}

/// Container for the signed-in user.
///
/// `authenticated` mirrors the session after every action, so an expired
/// credential anywhere in the client shows up here on the next call.
#[derive(Clone)]
pub struct UserStore {
    auth: AuthService,
    session: Arc<Session>,
    epoch: Arc<AtomicU64>,
    state: Arc<watch::Sender<UserState>>,
}

impl UserStore {
    pub fn new(auth: AuthService, session: Arc<Session>) -> Self {
        let (state, _) = watch::channel(UserState {
            authenticated: session.is_authenticated(),
            ..Default::default()
        });
        Self {
            auth,
            session,
            epoch: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    pub async fn login(&self, credentials: &LoginForm) -> bool {
        let epoch = self.begin();
        match self.auth.login(credentials).await {
            Ok(response) => {
                self.session.sign_in(response.token);
                self.finish(epoch, |state| state.user = Some(response.user))
            }
            Err(error) => {
                self.fail(epoch, &error, LOGIN_FAILED);
                false
            }
        }
    }

    /// Creates an account. The new user still has to log in.
    pub async fn register(&self, form: &RegisterForm) -> Option<User> {
        let epoch = self.begin();
        match self.auth.register(form).await {
            Ok(user) => self.finish(epoch, |_| {}).then_some(user),
            Err(error) => {
                self.fail(epoch, &error, REGISTER_FAILED);
                None
            }
        }
    }

    /// Signs out locally even when the backend call fails.
    pub async fn logout(&self) -> bool {
        let epoch = self.begin();
        let result = self.auth.logout().await;
        self.session.sign_out();
        match result {
            Ok(()) => self.finish(epoch, |state| state.user = None),
            Err(error) => {
                self.fail(epoch, &error, LOGOUT_FAILED);
                self.state.send_modify(|state| state.user = None);
                false
            }
        }
    }

    pub async fn load_current_user(&self) -> bool {
        let epoch = self.begin();
        match self.auth.current_user().await {
            Ok(user) => self.finish(epoch, |state| state.user = Some(user)),
            Err(error) => {
                self.fail(epoch, &error, LOAD_FAILED);
                false
            }
        }
    }

    pub async fn update_user(&self, id: EntityId, form: &UserForm) -> Option<User> {
        let epoch = self.begin();
        match self.auth.update_user(id, form).await {
            Ok(user) => self
                .finish(epoch, |state| {
                    if state.user.as_ref().is_some_and(|current| current.id == user.id) {
                        state.user = Some(user.clone());
                    }
                })
                .then_some(user),
            Err(error) => {
                self.fail(epoch, &error, UPDATE_FAILED);
                None
            }
        }
    }

    pub fn dismiss_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    /// Resets the container; responses to calls made before the reset are ignored.
    ///
    /// The session itself is left alone, so a token obtained by a late login
    /// is still stored.
    pub fn detach(&self) {
        let authenticated = self.session.is_authenticated();
        self.state.send_modify(|state| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *state = UserState {
                authenticated,
                ..Default::default()
            };
        });
    }

    pub fn state(&self) -> UserState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserState> {
        self.state.subscribe()
    }

    fn begin(&self) -> u64 {
        let mut epoch = 0;
        self.state.send_modify(|state| {
            epoch = self.epoch.load(Ordering::SeqCst);
            state.in_flight += 1;
            state.error = None;
        });
        epoch
    }

    /// Applies a completed call unless the container was detached since it began.
    fn finish(&self, epoch: u64, apply: impl FnOnce(&mut UserState)) -> bool {
        let authenticated = self.session.is_authenticated();
        let applied = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            apply(state);
            state.authenticated = authenticated;
            state.in_flight = state.in_flight.saturating_sub(1);
            true
        });
        if !applied {
            tracing::debug!("ignoring account response after detach");
        }
        applied
    }

    fn fail(&self, epoch: u64, error: &GatewayError, message: &str) {
        tracing::warn!(%error, failure = message, "user action failed");
        let signed_out = error.requires_reauthentication();
        self.finish(epoch, |state| {
            if signed_out {
                state.user = None;
            }
            state.error = Some(StoreError::new(error, message));
        });
    }
}
