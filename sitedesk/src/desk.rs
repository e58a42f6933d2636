use std::sync::Arc;

use crate::config::{Config, Transport};
use crate::gateway::Gateway;
use crate::gateway::command::CommandGateway;
use crate::gateway::rest::RestGateway;
use crate::notifications::{EventSource, NotificationCenter, WebSocketEventSource};
use crate::services::{AuthService, NotificationService, ProjectService, TaskService, UserService};
use crate::session::{FileCredentialStore, Session};
use crate::store::{EntityStore, ProjectStore, StalePolicy, TaskStore, UserStore};

/// Everything a client front end needs, wired to one session and one gateway.
#[derive(Clone)]
pub struct SiteDesk {
    pub session: Arc<Session>,
    pub account: UserStore,
    pub projects: ProjectStore,
    pub tasks: TaskStore,
    pub notifications: NotificationCenter,
    /// Directory of all users, outside the signed-in account
    pub users: UserService,
}

impl SiteDesk {
    pub fn from_config(config: &Config) -> Self {
        let settings = &config.sitedesk;
        let session = Arc::new(Session::new(Box::new(FileCredentialStore::new(
            settings.session().credential_file.clone(),
        ))));
        let api = settings.api();
        let gateway: Arc<dyn Gateway> = match api.transport {
            Transport::Rest => Arc::new(RestGateway::new(api.base_url.clone(), session.clone())),
            Transport::Command => {
                Arc::new(CommandGateway::new(api.base_url.clone(), session.clone()))
            }
        };
        tracing::info!(base_url = %api.base_url, transport = ?api.transport, "client configured");

        let events = Arc::new(WebSocketEventSource::new(api.events_url.clone()));
        Self::with_gateway(gateway, session, events, settings.store().stale_responses)
    }

    pub fn with_gateway(
        gateway: Arc<dyn Gateway>,
        session: Arc<Session>,
        events: Arc<dyn EventSource>,
        policy: StalePolicy,
    ) -> Self {
        Self {
            account: UserStore::new(AuthService::new(gateway.clone()), session.clone()),
            projects: EntityStore::new(ProjectService::new(gateway.clone()), policy),
            tasks: EntityStore::new(TaskService::new(gateway.clone()), policy),
            notifications: NotificationCenter::new(
                NotificationService::new(gateway.clone()),
                events,
            ),
            users: UserService::new(gateway),
            session,
        }
    }
}
