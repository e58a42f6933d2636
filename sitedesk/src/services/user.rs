use std::sync::Arc;

use super::{CrudService, FailureMessages, NoFilter, Resource, decode, encode, prepare};
use crate::gateway::{Command, Gateway, GatewayError};
use crate::models::{EntityId, LoginForm, LoginResponse, RegisterForm, User, UserForm};

pub type UserService = CrudService<User>;

impl Resource for User {
    const SINGULAR: &'static str = "user";
    const PLURAL: &'static str = "users";
    const MESSAGES: FailureMessages = FailureMessages {
        fetch_all: "사용자 목록을 불러오는데 실패했습니다",
        fetch_one: "사용자 정보를 가져오는데 실패했습니다",
        create: "사용자 생성에 실패했습니다",
        update: "사용자 정보 수정에 실패했습니다",
        delete: "사용자 삭제에 실패했습니다",
    };

    type Form = RegisterForm;
    type Patch = UserForm;
    type Filter = NoFilter;
}

/// Authentication operations of the current client.
#[derive(Clone)]
pub struct AuthService {
    gateway: Arc<dyn Gateway>,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Exchanges credentials for a bearer token and the signed-in user.
    #[tracing::instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginForm) -> Result<LoginResponse, GatewayError> {
        let command = Command::new("login").arg("credentials", encode(credentials)?);
        self.call(command).await
    }

    #[tracing::instrument(skip_all, fields(username = %form.username))]
    pub async fn register(&self, form: &RegisterForm) -> Result<User, GatewayError> {
        let command = Command::new("register").arg("userData", prepare(form)?);
        self.call(command).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), GatewayError> {
        self.gateway
            .invoke(Command::new("logout"))
            .await
            .map(|_| ())
            .inspect_err(|error| tracing::error!(%error, "logout failed"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, GatewayError> {
        self.call(Command::new("get_current_user")).await
    }

    #[tracing::instrument(skip(self, form))]
    pub async fn update_user(&self, id: EntityId, form: &UserForm) -> Result<User, GatewayError> {
        let command = Command::new("update_user")
            .arg("id", id)
            .arg("user", prepare(form)?);
        self.call(command).await
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        command: Command,
    ) -> Result<T, GatewayError> {
        let name = command.name.clone();
        self.gateway
            .invoke(command)
            .await
            .and_then(decode)
            .inspect_err(|error| tracing::error!(command = %name, %error, "auth call failed"))
    }
}
