use std::sync::Arc;

use crate::api::error::{ApiError, Result};
use crate::api::models::{ListingKind, Role};
use crate::api::ApiClient;
use crate::app::{AppConfig, SessionHandle};
use crate::storage::Storage;
use crate::ui::browse::Browser;
use crate::ui::chat_view::ChatPanel;
use crate::ui::dashboard::{AdminDashboard, SellerDashboard};
use crate::ui::listings::ListingManager;
use crate::ui::login::AuthFlow;
use crate::ui::search::SearchContext;
use crate::ui::sidebar::Inbox;

/// Wires the shared pieces together: one client, one session, one search
/// context. Views are created from here on demand.
pub struct MainWindow {
    config: AppConfig,
    client: Arc<ApiClient>,
    storage: Option<Arc<Storage>>,
    search: SearchContext<ApiClient>,
}

impl MainWindow {
    pub fn new(config: AppConfig, storage: Option<Arc<Storage>>) -> Result<Self> {
        let session = match &storage {
            Some(store) => SessionHandle::restore(store)?,
            None => SessionHandle::default(),
        };
        let client = Arc::new(ApiClient::new(&config, session)?);
        let search = SearchContext::new(client.clone());
        Ok(Self { config, client, storage, search })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn session(&self) -> &SessionHandle {
        self.client.session()
    }

    pub fn search(&self) -> &SearchContext<ApiClient> {
        &self.search
    }

    pub fn auth(&self) -> AuthFlow<ApiClient> {
        AuthFlow::new(self.client.clone(), self.session().clone(), self.storage.clone())
    }

    pub async fn browser(&self) -> Result<Browser> {
        Browser::load(self.client.as_ref()).await
    }

    pub fn inbox(&self) -> Inbox<ApiClient> {
        Inbox::new(self.client.clone())
    }

    pub fn chat_with(&self, counterpart_id: &str) -> Result<ChatPanel<ApiClient>> {
        let user_id = self.session().user_id().ok_or(ApiError::NotAuthenticated)?;
        Ok(ChatPanel::new(self.client.clone(), &user_id, counterpart_id, self.config.poll_interval()))
    }

    pub fn seller_dashboard(&self) -> Result<SellerDashboard<ApiClient>> {
        Ok(SellerDashboard::new(self.client.clone(), &self.require_seller()?))
    }

    pub fn listings(&self, kind: ListingKind) -> Result<ListingManager<ApiClient>> {
        Ok(ListingManager::new(self.client.clone(), &self.require_seller()?, kind))
    }

    pub fn admin_dashboard(&self) -> Result<AdminDashboard<ApiClient>> {
        match self.session().role() {
            Some(Role::Admin) => Ok(AdminDashboard::new(self.client.clone())),
            Some(_) => Err(ApiError::Unauthorized("admin role required".into())),
            None => Err(ApiError::NotAuthenticated),
        }
    }

    fn require_seller(&self) -> Result<String> {
        if !self.session().is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        self.session()
            .seller_id()
            .ok_or_else(|| ApiError::Unauthorized("seller account required".into()))
    }
}
