use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Method, RequestBuilder};
use serde_json::{json, Value};

use crate::api::error::{ApiError, Result};
use crate::api::models::{
    decode_list, decode_one, AdminStats, Attachment, BuyerRegistration, Category, Conversation,
    Credentials, KycDecision, KycRequest, KycStatus, KycSubmission, Listing, ListingKind,
    ListingUpdate, LoginResponse, Message, NewListing, PasswordReset, ProfileUpdate, Seller,
    SellerAction, SellerProfile, SellerRegistration, SellerStats,
};
use crate::app::{AppConfig, SessionHandle};
use crate::utils::join_api;

#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    async fn search_sellers(&self, query: &str) -> Result<Vec<Seller>>;
}

#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>>;
    async fn seller(&self, seller_id: &str) -> Result<Seller>;
    async fn seller_listings(&self, seller_id: &str, kind: ListingKind) -> Result<Vec<Listing>>;
}

#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    async fn conversations(&self) -> Result<Vec<Conversation>>;
    async fn messages(&self, user_id: &str, counterpart_id: &str) -> Result<Vec<Message>>;
    async fn send_message(&self, recipient_id: &str, content: &str) -> Result<()>;
    async fn mark_read(&self, message_id: &str) -> Result<()>;
}

#[async_trait]
pub trait SellerBackend: Send + Sync {
    async fn profile(&self, seller_id: &str) -> Result<SellerProfile>;
    async fn update_profile(&self, seller_id: &str, update: &ProfileUpdate) -> Result<SellerProfile>;
    async fn stats(&self, seller_id: &str) -> Result<SellerStats>;
    async fn listings(&self, seller_id: &str, kind: ListingKind) -> Result<Vec<Listing>>;
    async fn create_listing(&self, seller_id: &str, kind: ListingKind, listing: NewListing) -> Result<()>;
    async fn update_listing(&self, kind: ListingKind, listing_id: &str, update: &ListingUpdate) -> Result<()>;
    async fn delete_listing(&self, kind: ListingKind, listing_id: &str) -> Result<()>;
    async fn submit_kyc(&self, submission: KycSubmission) -> Result<()>;
    async fn kyc_status(&self) -> Result<KycStatus>;
}

#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn admin_stats(&self) -> Result<AdminStats>;
    async fn kyc_requests(&self) -> Result<Vec<KycRequest>>;
    async fn review_kyc(&self, request_id: &str, decision: &KycDecision) -> Result<()>;
    async fn sellers(&self) -> Result<Vec<Seller>>;
    async fn set_seller_status(&self, seller_id: &str, action: SellerAction) -> Result<()>;
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse>;
    async fn register_buyer(&self, registration: &BuyerRegistration) -> Result<()>;
    async fn register_seller(&self, registration: &SellerRegistration) -> Result<()>;
    async fn forgot_password(&self, email: &str) -> Result<()>;
    async fn reset_password(&self, reset: &PasswordReset) -> Result<()>;
    async fn verify_email(&self, token: &str) -> Result<()>;
}

/// One configured HTTP client bound to a single backend origin. The bearer
/// token is read from the injected session on every request.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(config: &AppConfig, session: SessionHandle) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        url::Url::parse(&config.base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base url {}: {e}", config.base_url)))?;
        Ok(Self { http, base_url: config.base_url.clone(), session })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn with_auth(mut req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {}", t));
        }
        req
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, join_api(&self.base_url, path));
        Self::with_auth(req, self.session.token().as_deref())
    }

    /// Send and read the body as loose JSON; an empty body reads as `null`.
    async fn send(&self, req: RequestBuilder) -> Result<Value> {
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            log::warn!("[api] HTTP {status}: {text}");
            return Err(ApiError::from_status(status, error_message(&text)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(ApiError::from)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        log::debug!("[api] GET {path}");
        self.send(self.request(Method::GET, path)).await
    }

    async fn post(&self, path: &str, body: &impl serde::Serialize) -> Result<Value> {
        log::debug!("[api] POST {path}");
        self.send(self.request(Method::POST, path).json(body)).await
    }

    /// Reachability probe used by the CLI before saving a new base url.
    pub async fn ping(&self) -> Result<u16> {
        let resp = self.request(Method::GET, "health").send().await?;
        Ok(resp.status().as_u16())
    }
}

/// Prefer the backend's `message`/`error` field over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Login responses sometimes nest identity under `user`; hoist those fields
/// next to the token.
fn merge_user(json: Value) -> Value {
    let Value::Object(mut top) = json else { return json };
    if let Some(Value::Object(user)) = top.remove("user") {
        for (k, v) in user {
            let key = match k.as_str() {
                "id" | "_id" => "userId".to_string(),
                _ => k,
            };
            top.entry(key).or_insert(v);
        }
    }
    Value::Object(top)
}

fn attachment_part(file: Attachment) -> Result<Part> {
    Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.mime)
        .map_err(|e| ApiError::invalid("images", &e.to_string()))
}

fn listing_form(listing: NewListing) -> Result<Form> {
    let mut form = Form::new()
        .text("name", listing.name)
        .text("category", listing.category)
        .text("price", listing.price.to_string())
        .text("quantity", listing.quantity.to_string());
    if let Some(desc) = listing.description {
        form = form.text("description", desc);
    }
    for image in listing.images {
        form = form.part("images", attachment_part(image)?);
    }
    Ok(form)
}

#[async_trait]
impl SearchBackend for ApiClient {
    async fn search_sellers(&self, query: &str) -> Result<Vec<Seller>> {
        log::debug!("[api] GET sellers/search q={query}");
        let req = self.request(Method::GET, "sellers/search").query(&[("q", query)]);
        let json = self.send(req).await?;
        Ok(decode_list(&json, &["sellers", "results", "data"]))
    }
}

#[async_trait]
impl CatalogBackend for ApiClient {
    async fn categories(&self) -> Result<Vec<Category>> {
        let json = self.get("categories").await?;
        Ok(decode_list(&json, &["categories", "data"]))
    }

    async fn seller(&self, seller_id: &str) -> Result<Seller> {
        let json = self.get(&format!("sellers/{seller_id}")).await?;
        decode_one(json, &["seller"])
    }

    async fn seller_listings(&self, seller_id: &str, kind: ListingKind) -> Result<Vec<Listing>> {
        SellerBackend::listings(self, seller_id, kind).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn conversations(&self) -> Result<Vec<Conversation>> {
        let json = self.get("messages/conversations").await?;
        Ok(decode_list(&json, &["conversations", "data"]))
    }

    async fn messages(&self, user_id: &str, counterpart_id: &str) -> Result<Vec<Message>> {
        let json = self.get(&format!("messages/{user_id}/{counterpart_id}")).await?;
        Ok(decode_list(&json, &["messages", "data"]))
    }

    async fn send_message(&self, recipient_id: &str, content: &str) -> Result<()> {
        let body = json!({ "recipientId": recipient_id, "content": content });
        self.post("messages/send", &body).await.map(|_| ())
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        self.post(&format!("messages/{message_id}/read"), &json!({})).await.map(|_| ())
    }
}

#[async_trait]
impl SellerBackend for ApiClient {
    async fn profile(&self, seller_id: &str) -> Result<SellerProfile> {
        let json = self.get(&format!("sellers/{seller_id}/profile")).await?;
        decode_one(json, &["profile", "seller"])
    }

    async fn update_profile(&self, seller_id: &str, update: &ProfileUpdate) -> Result<SellerProfile> {
        let path = format!("sellers/{seller_id}/profile");
        log::debug!("[api] PUT {path}");
        let json = self.send(self.request(Method::PUT, &path).json(update)).await?;
        decode_one(json, &["profile", "seller"])
    }

    async fn stats(&self, seller_id: &str) -> Result<SellerStats> {
        let json = self.get(&format!("sellers/{seller_id}/stats")).await?;
        decode_one(json, &["stats"])
    }

    async fn listings(&self, seller_id: &str, kind: ListingKind) -> Result<Vec<Listing>> {
        let json = self.get(&format!("sellers/{seller_id}/{}", kind.segment())).await?;
        let mut items: Vec<Listing> = decode_list(&json, &[kind.segment(), "listings", "data"]);
        for item in &mut items {
            item.kind = kind;
        }
        Ok(items)
    }

    async fn create_listing(&self, seller_id: &str, kind: ListingKind, listing: NewListing) -> Result<()> {
        let path = format!("sellers/{seller_id}/{}", kind.segment());
        log::info!("[api] uploading {} '{}' with {} image(s)", kind.segment(), listing.name, listing.images.len());
        let form = listing_form(listing)?;
        self.send(self.request(Method::POST, &path).multipart(form)).await.map(|_| ())
    }

    async fn update_listing(&self, kind: ListingKind, listing_id: &str, update: &ListingUpdate) -> Result<()> {
        let path = format!("{}/{listing_id}", kind.segment());
        self.send(self.request(Method::PUT, &path).json(update)).await.map(|_| ())
    }

    async fn delete_listing(&self, kind: ListingKind, listing_id: &str) -> Result<()> {
        let path = format!("{}/{listing_id}", kind.segment());
        log::debug!("[api] DELETE {path}");
        self.send(self.request(Method::DELETE, &path)).await.map(|_| ())
    }

    async fn submit_kyc(&self, submission: KycSubmission) -> Result<()> {
        let form = Form::new()
            .text("documentType", submission.document_type)
            .text("documentNumber", submission.document_number)
            .part("document", attachment_part(submission.document)?);
        self.send(self.request(Method::POST, "kyc").multipart(form)).await.map(|_| ())
    }

    async fn kyc_status(&self) -> Result<KycStatus> {
        let json = self.get("kyc/status").await?;
        let field = json.get("status").or_else(|| json.get("kycStatus")).cloned();
        serde_json::from_value(field.unwrap_or(json)).map_err(ApiError::from)
    }
}

#[async_trait]
impl AdminBackend for ApiClient {
    async fn admin_stats(&self) -> Result<AdminStats> {
        let json = self.get("admin/stats").await?;
        decode_one(json, &["stats"])
    }

    async fn kyc_requests(&self) -> Result<Vec<KycRequest>> {
        let json = self.get("admin/kyc").await?;
        Ok(decode_list(&json, &["requests", "kyc", "data"]))
    }

    async fn review_kyc(&self, request_id: &str, decision: &KycDecision) -> Result<()> {
        let body = match decision {
            KycDecision::Approve => json!({}),
            KycDecision::Reject { reason } => json!({ "reason": reason }),
        };
        let path = format!("admin/kyc/{request_id}/{}", decision.segment());
        self.post(&path, &body).await.map(|_| ())
    }

    async fn sellers(&self) -> Result<Vec<Seller>> {
        let json = self.get("admin/sellers").await?;
        Ok(decode_list(&json, &["sellers", "data"]))
    }

    async fn set_seller_status(&self, seller_id: &str, action: SellerAction) -> Result<()> {
        let path = format!("admin/sellers/{seller_id}/{}", action.segment());
        self.post(&path, &json!({})).await.map(|_| ())
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let json = self.post("auth/login", credentials).await?;
        let resp: LoginResponse = serde_json::from_value(merge_user(json))?;
        if resp.token.is_empty() {
            return Err(ApiError::Decode("Token not found in response".into()));
        }
        Ok(resp)
    }

    async fn register_buyer(&self, registration: &BuyerRegistration) -> Result<()> {
        self.post("auth/register", registration).await.map(|_| ())
    }

    async fn register_seller(&self, registration: &SellerRegistration) -> Result<()> {
        self.post("auth/register/seller", registration).await.map(|_| ())
    }

    async fn forgot_password(&self, email: &str) -> Result<()> {
        self.post("auth/forgot-password", &json!({ "email": email })).await.map(|_| ())
    }

    async fn reset_password(&self, reset: &PasswordReset) -> Result<()> {
        self.post("auth/reset-password", reset).await.map(|_| ())
    }

    async fn verify_email(&self, token: &str) -> Result<()> {
        let req = self.request(Method::GET, "auth/verify-email").query(&[("token", token)]);
        self.send(req).await.map(|_| ())
    }
}
