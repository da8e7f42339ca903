use std::sync::Arc;

use crate::api::error::{ApiError, Result};
use crate::api::models::{
    AdminStats, KycDecision, KycRequest, KycStatus, ProfileUpdate, Seller, SellerAction, SellerProfile,
    SellerStats, SellerStatus,
};
use crate::api::{AdminBackend, SellerBackend};
use crate::ui::optimistic::{self, MutationOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    Error(String),
}

impl<T> ViewState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    fn ready_mut(&mut self, what: &str) -> Result<&mut T> {
        match self {
            ViewState::Ready(v) => Ok(v),
            _ => Err(ApiError::NotLoaded(what.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellerOverview {
    pub profile: SellerProfile,
    pub stats: SellerStats,
}

pub struct SellerDashboard<B> {
    backend: Arc<B>,
    seller_id: String,
    state: ViewState<SellerOverview>,
}

impl<B: SellerBackend> SellerDashboard<B> {
    pub fn new(backend: Arc<B>, seller_id: &str) -> Self {
        Self { backend, seller_id: seller_id.to_string(), state: ViewState::Loading }
    }

    pub fn state(&self) -> &ViewState<SellerOverview> {
        &self.state
    }

    /// Profile failure puts the view in `Error`; missing stats just show zeros.
    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        let (profile, stats) =
            tokio::join!(self.backend.profile(&self.seller_id), self.backend.stats(&self.seller_id));
        let profile = match profile {
            Ok(p) => p,
            Err(e) => {
                log::warn!("[dashboard] profile for {} failed: {e}", self.seller_id);
                self.state = ViewState::Error(e.to_string());
                return;
            }
        };
        let stats = stats.unwrap_or_else(|e| {
            log::warn!("[dashboard] stats for {} failed: {e}", self.seller_id);
            SellerStats::default()
        });
        self.state = ViewState::Ready(SellerOverview { profile, stats });
    }

    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<()> {
        let profile = self.backend.update_profile(&self.seller_id, update).await?;
        self.state.ready_mut("seller dashboard")?.profile = profile;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdminOverview {
    pub stats: AdminStats,
    pub kyc: Vec<KycRequest>,
    pub sellers: Vec<Seller>,
}

pub struct AdminDashboard<B> {
    backend: Arc<B>,
    state: ViewState<AdminOverview>,
}

impl<B: AdminBackend> AdminDashboard<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend, state: ViewState::Loading }
    }

    pub fn state(&self) -> &ViewState<AdminOverview> {
        &self.state
    }

    /// Each section degrades to empty on its own failure.
    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        let (stats, kyc, sellers) = tokio::join!(
            self.backend.admin_stats(),
            self.backend.kyc_requests(),
            self.backend.sellers()
        );
        let overview = AdminOverview {
            stats: stats.unwrap_or_else(|e| {
                log::warn!("[admin] stats failed: {e}");
                AdminStats::default()
            }),
            kyc: kyc.unwrap_or_else(|e| {
                log::warn!("[admin] kyc queue failed: {e}");
                Vec::new()
            }),
            sellers: sellers.unwrap_or_else(|e| {
                log::warn!("[admin] sellers failed: {e}");
                Vec::new()
            }),
        };
        self.state = ViewState::Ready(overview);
    }

    pub fn kyc_with_status(&self, status: KycStatus) -> Vec<KycRequest> {
        self.state
            .ready()
            .map(|o| o.kyc.iter().filter(|k| k.status == status).cloned().collect())
            .unwrap_or_default()
    }

    pub fn sellers_with_status(&self, status: SellerStatus) -> Vec<Seller> {
        self.state
            .ready()
            .map(|o| o.sellers.iter().filter(|s| s.status == status).cloned().collect())
            .unwrap_or_default()
    }

    pub async fn approve_kyc(&mut self, request_id: &str) -> Result<MutationOutcome> {
        self.review_kyc(request_id, KycDecision::Approve).await
    }

    pub async fn reject_kyc(&mut self, request_id: &str, reason: &str) -> Result<MutationOutcome> {
        self.review_kyc(request_id, KycDecision::Reject { reason: reason.to_string() }).await
    }

    pub async fn suspend_seller(&mut self, seller_id: &str) -> Result<MutationOutcome> {
        self.change_seller(seller_id, SellerAction::Suspend).await
    }

    pub async fn activate_seller(&mut self, seller_id: &str) -> Result<MutationOutcome> {
        self.change_seller(seller_id, SellerAction::Activate).await
    }

    async fn review_kyc(&mut self, request_id: &str, decision: KycDecision) -> Result<MutationOutcome> {
        let next = decision.status();
        let overview = self.state.ready_mut("admin dashboard")?;
        let was_pending = overview
            .kyc
            .iter()
            .any(|k| k.id == request_id && k.status == KycStatus::Pending);
        let pending = optimistic::apply(&mut overview.kyc, |k| k.id == request_id, |k| {
            k.status = next;
            if let KycDecision::Reject { reason } = &decision {
                k.reason = Some(reason.clone());
            }
        })
        .ok_or_else(|| ApiError::NotFound(format!("kyc request {request_id}")))?;

        log::info!("[admin] kyc {request_id} -> {next:?}");
        let result = self.backend.review_kyc(request_id, &decision).await;

        let overview = self.state.ready_mut("admin dashboard")?;
        let outcome = pending.settle(&mut overview.kyc, result);
        if outcome.is_committed() && was_pending {
            overview.stats.pending_kyc = overview.stats.pending_kyc.saturating_sub(1);
        }
        Ok(outcome)
    }

    async fn change_seller(&mut self, seller_id: &str, action: SellerAction) -> Result<MutationOutcome> {
        let next = action.status();
        let overview = self.state.ready_mut("admin dashboard")?;
        let previous = overview.sellers.iter().find(|s| s.id == seller_id).map(|s| s.status);
        let pending = optimistic::apply(&mut overview.sellers, |s| s.id == seller_id, |s| s.status = next)
            .ok_or_else(|| ApiError::NotFound(format!("seller {seller_id}")))?;

        log::info!("[admin] seller {seller_id} -> {next:?}");
        let result = self.backend.set_seller_status(seller_id, action).await;

        let overview = self.state.ready_mut("admin dashboard")?;
        let outcome = pending.settle(&mut overview.sellers, result);
        if outcome.is_committed() && previous != Some(next) {
            let count = &mut overview.stats.suspended_sellers;
            match next {
                SellerStatus::Suspended => *count += 1,
                _ if previous == Some(SellerStatus::Suspended) => *count = count.saturating_sub(1),
                _ => {}
            }
        }
        Ok(outcome)
    }
}
