use std::sync::Arc;

use crate::api::error::{ApiError, FieldError, Result};
use crate::api::models::{
    KycStatus, KycSubmission, Listing, ListingKind, ListingUpdate, NewListing, SellerProfile, SellerStatus,
};
use crate::api::SellerBackend;

pub const MAX_IMAGES: usize = 5;
const IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

pub fn validate_new_listing(listing: &NewListing, kind: ListingKind) -> Result<()> {
    let mut errors = Vec::new();
    if listing.name.trim().is_empty() {
        errors.push(FieldError::new("name", "is required"));
    }
    if listing.category.trim().is_empty() {
        errors.push(FieldError::new("category", "is required"));
    }
    if listing.price <= 0 {
        errors.push(FieldError::new("price", "must be greater than zero"));
    }
    if kind == ListingKind::Product && listing.quantity == 0 {
        errors.push(FieldError::new("quantity", "must be at least one"));
    }
    if listing.images.len() > MAX_IMAGES {
        errors.push(FieldError::new("images", &format!("at most {MAX_IMAGES} images")));
    }
    if listing.images.iter().any(|i| !IMAGE_TYPES.contains(&i.mime.as_str())) {
        errors.push(FieldError::new("images", "only JPEG, PNG or WebP images"));
    }
    if errors.is_empty() { Ok(()) } else { Err(ApiError::Validation(errors)) }
}

/// A seller's own products or services.
pub struct ListingManager<B> {
    backend: Arc<B>,
    seller_id: String,
    kind: ListingKind,
    items: Vec<Listing>,
}

impl<B: SellerBackend> ListingManager<B> {
    pub fn new(backend: Arc<B>, seller_id: &str, kind: ListingKind) -> Self {
        Self { backend, seller_id: seller_id.to_string(), kind, items: Vec::new() }
    }

    pub fn items(&self) -> &[Listing] {
        &self.items
    }

    pub async fn load(&mut self) -> Result<()> {
        self.items = self.backend.listings(&self.seller_id, self.kind).await?;
        Ok(())
    }

    /// Current KYC state; asks the backend when the profile doesn't carry it.
    pub async fn kyc_status(&self, profile: &SellerProfile) -> Result<KycStatus> {
        match profile.kyc_status {
            Some(status) => Ok(status),
            None => self.backend.kyc_status().await,
        }
    }

    // A failed re-fetch after a committed change keeps the stale list.
    async fn refresh_after(&mut self, action: &str) {
        if let Err(e) = self.load().await {
            log::warn!("[listings] {action} succeeded but refresh failed: {e}");
        }
    }

    /// Uploading needs an approved KYC; the payload is dropped once posted.
    pub async fn upload(&mut self, listing: NewListing) -> Result<()> {
        validate_new_listing(&listing, self.kind)?;
        let profile = self.backend.profile(&self.seller_id).await?;
        let kyc = self.kyc_status(&profile).await?;
        if kyc != KycStatus::Approved || profile.seller.status != SellerStatus::Active {
            return Err(ApiError::Unauthorized("KYC verification must be approved before uploading".into()));
        }
        self.backend.create_listing(&self.seller_id, self.kind, listing).await?;
        self.refresh_after("upload").await;
        Ok(())
    }

    /// Edits are not applied locally; the list is re-fetched instead.
    pub async fn update(&mut self, listing_id: &str, update: &ListingUpdate) -> Result<()> {
        if update.price.is_some_and(|p| p <= 0) {
            return Err(ApiError::invalid("price", "must be greater than zero"));
        }
        self.backend.update_listing(self.kind, listing_id, update).await?;
        self.refresh_after("update").await;
        Ok(())
    }

    pub async fn delete(&mut self, listing_id: &str) -> Result<()> {
        self.backend.delete_listing(self.kind, listing_id).await?;
        self.items.retain(|l| l.id != listing_id);
        log::info!("[listings] deleted {} {listing_id}", self.kind.segment());
        Ok(())
    }

    pub async fn submit_kyc(&self, submission: KycSubmission) -> Result<()> {
        if submission.document_number.trim().is_empty() {
            return Err(ApiError::invalid("documentNumber", "is required"));
        }
        self.backend.submit_kyc(submission).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Attachment, ProfileUpdate, SellerStats};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeShop {
        kyc: KycStatus,
        items: Mutex<Vec<Listing>>,
        creates: AtomicUsize,
        fail_delete: bool,
        fail_refresh: bool,
        kyc_in_profile: bool,
    }

    impl FakeShop {
        fn new(kyc: KycStatus) -> Self {
            let items = vec![
                Listing { id: "p1".into(), name: "Ankara Gown".into(), price: 15000, ..Default::default() },
                Listing { id: "p2".into(), name: "Silk Scarf".into(), price: 4000, ..Default::default() },
            ];
            Self {
                kyc,
                items: Mutex::new(items),
                creates: AtomicUsize::new(0),
                fail_delete: false,
                fail_refresh: false,
                kyc_in_profile: true,
            }
        }
    }

    #[async_trait]
    impl SellerBackend for FakeShop {
        async fn profile(&self, _: &str) -> Result<SellerProfile> {
            let kyc_status = self.kyc_in_profile.then_some(self.kyc);
            Ok(SellerProfile { kyc_status, ..Default::default() })
        }

        async fn update_profile(&self, s: &str, _: &ProfileUpdate) -> Result<SellerProfile> {
            self.profile(s).await
        }

        async fn stats(&self, _: &str) -> Result<SellerStats> {
            Ok(SellerStats::default())
        }

        async fn listings(&self, _: &str, _: ListingKind) -> Result<Vec<Listing>> {
            if self.fail_refresh {
                return Err(ApiError::Transport("timeout".into()));
            }
            Ok(self.items.lock().clone())
        }

        async fn create_listing(&self, seller_id: &str, kind: ListingKind, listing: NewListing) -> Result<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            let mut items = self.items.lock();
            let id = format!("p{}", items.len() + 1);
            items.push(Listing {
                id,
                name: listing.name,
                price: listing.price,
                seller_id: seller_id.to_string(),
                kind,
                ..Default::default()
            });
            Ok(())
        }

        async fn update_listing(&self, _: ListingKind, id: &str, update: &ListingUpdate) -> Result<()> {
            if let Some(item) = self.items.lock().iter_mut().find(|l| l.id == id) {
                if let Some(price) = update.price {
                    item.price = price;
                }
            }
            Ok(())
        }

        async fn delete_listing(&self, _: ListingKind, id: &str) -> Result<()> {
            if self.fail_delete {
                return Err(ApiError::NotFound(format!("listing {id}")));
            }
            self.items.lock().retain(|l| l.id != id);
            Ok(())
        }

        async fn submit_kyc(&self, _: KycSubmission) -> Result<()> {
            Ok(())
        }

        async fn kyc_status(&self) -> Result<KycStatus> {
            Ok(self.kyc)
        }
    }

    fn gown() -> NewListing {
        NewListing {
            name: "Adire Shirt".into(),
            category: "fashion".into(),
            price: 9000,
            quantity: 3,
            description: None,
            images: vec![Attachment { file_name: "a.jpg".into(), mime: "image/jpeg".into(), bytes: vec![1, 2] }],
        }
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut listing = gown();
        listing.name = " ".into();
        listing.price = 0;
        listing.quantity = 0;
        listing.images[0].mime = "application/pdf".into();
        let err = validate_new_listing(&listing, ListingKind::Product).unwrap_err();
        let fields: Vec<&str> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "price", "quantity", "images"]);

        let mut listing = gown();
        listing.quantity = 0;
        assert!(validate_new_listing(&listing, ListingKind::Service).is_ok());

        listing.images = vec![listing.images[0].clone(); MAX_IMAGES];
        assert!(validate_new_listing(&listing, ListingKind::Service).is_ok());
        listing.images.push(listing.images[0].clone());
        let err = validate_new_listing(&listing, ListingKind::Service).unwrap_err();
        assert_eq!(err.field_errors(), &[FieldError::new("images", "at most 5 images")]);
    }

    #[tokio::test]
    async fn upload_refetches_list() {
        let backend = Arc::new(FakeShop::new(KycStatus::Approved));
        let mut mgr = ListingManager::new(backend.clone(), "s1", ListingKind::Product);
        mgr.upload(gown()).await.unwrap();
        assert_eq!(mgr.items().len(), 3);
        assert_eq!(mgr.items()[2].name, "Adire Shirt");
    }

    #[tokio::test]
    async fn upload_blocked_until_kyc_approved() {
        let backend = Arc::new(FakeShop::new(KycStatus::Pending));
        let mut mgr = ListingManager::new(backend.clone(), "s1", ListingKind::Product);
        assert!(matches!(mgr.upload(gown()).await, Err(ApiError::Unauthorized(_))));
        assert_eq!(backend.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn committed_upload_survives_a_failed_refresh() {
        let mut shop = FakeShop::new(KycStatus::Approved);
        shop.fail_refresh = true;
        let backend = Arc::new(shop);
        let mut mgr = ListingManager::new(backend.clone(), "s1", ListingKind::Product);

        mgr.upload(gown()).await.unwrap();
        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);

        let update = ListingUpdate { price: Some(12000), ..Default::default() };
        mgr.update("p1", &update).await.unwrap();
        assert_eq!(backend.items.lock()[0].price, 12000);
    }

    #[tokio::test]
    async fn kyc_status_is_fetched_when_profile_omits_it() {
        let mut shop = FakeShop::new(KycStatus::Approved);
        shop.kyc_in_profile = false;
        let mut mgr = ListingManager::new(Arc::new(shop), "s1", ListingKind::Product);
        assert_eq!(mgr.kyc_status(&SellerProfile::default()).await.unwrap(), KycStatus::Approved);
        mgr.upload(gown()).await.unwrap();
        assert_eq!(mgr.items().len(), 3);

        let mut shop = FakeShop::new(KycStatus::Rejected);
        shop.kyc_in_profile = false;
        let backend = Arc::new(shop);
        let mut mgr = ListingManager::new(backend.clone(), "s1", ListingKind::Product);
        assert!(matches!(mgr.upload(gown()).await, Err(ApiError::Unauthorized(_))));
        assert_eq!(backend.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_then_refetch() {
        let backend = Arc::new(FakeShop::new(KycStatus::Approved));
        let mut mgr = ListingManager::new(backend, "s1", ListingKind::Product);
        mgr.load().await.unwrap();
        let update = ListingUpdate { price: Some(12000), ..Default::default() };
        mgr.update("p1", &update).await.unwrap();
        assert_eq!(mgr.items()[0].price, 12000);

        let bad = ListingUpdate { price: Some(-1), ..Default::default() };
        assert!(matches!(mgr.update("p1", &bad).await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn delete_removes_locally_only_on_success() {
        let mut shop = FakeShop::new(KycStatus::Approved);
        shop.fail_delete = true;
        let mut mgr = ListingManager::new(Arc::new(shop), "s1", ListingKind::Product);
        mgr.load().await.unwrap();
        assert!(mgr.delete("p1").await.is_err());
        assert_eq!(mgr.items().len(), 2);

        let mut mgr = ListingManager::new(Arc::new(FakeShop::new(KycStatus::Approved)), "s1", ListingKind::Product);
        mgr.load().await.unwrap();
        mgr.delete("p1").await.unwrap();
        assert_eq!(mgr.items().iter().map(|l| l.id.as_str()).collect::<Vec<_>>(), vec!["p2"]);
    }
}
