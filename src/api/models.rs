use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::api::error::{ApiError, Result};

/// Treat an explicit `null` like a missing field.
fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "user")]
    Buyer,
    #[serde(alias = "vendor")]
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" | "user" => Some(Role::Buyer),
            "seller" | "vendor" => Some(Role::Seller),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    #[serde(deserialize_with = "null_default")]
    pub city: String,
    #[serde(deserialize_with = "null_default")]
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SellerStatus {
    #[default]
    Active,
    Suspended,
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Seller {
    #[serde(alias = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(alias = "businessName", alias = "storeName", deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub email: String,
    #[serde(deserialize_with = "null_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_default")]
    pub category: String,
    #[serde(alias = "logoUrl")]
    pub logo: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub location: Location,
    #[serde(alias = "reviewCount", deserialize_with = "null_default")]
    pub reviews: u32,
    pub rating: Option<f32>,
    #[serde(deserialize_with = "null_default")]
    pub status: SellerStatus,
    #[serde(deserialize_with = "null_default")]
    pub products: Vec<Listing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    #[default]
    Product,
    Service,
}

impl ListingKind {
    /// Path segment the backend uses for this kind of listing.
    pub fn segment(&self) -> &'static str {
        match self {
            ListingKind::Product => "products",
            ListingKind::Service => "services",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Listing {
    #[serde(alias = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(alias = "title", deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub category: String,
    #[serde(deserialize_with = "null_default")]
    pub price: i64,
    #[serde(deserialize_with = "null_default")]
    pub quantity: u32,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub images: Vec<String>,
    #[serde(alias = "seller", deserialize_with = "null_default")]
    pub seller_id: String,
    #[serde(deserialize_with = "null_default")]
    pub kind: ListingKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    #[serde(alias = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(alias = "title", deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub sellers: Vec<Seller>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Conversation {
    #[serde(alias = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(alias = "otherUserId", alias = "participantId", deserialize_with = "null_default")]
    pub counterpart_id: String,
    #[serde(alias = "otherUserName", alias = "participantName", deserialize_with = "null_default")]
    pub counterpart_name: String,
    pub last_message: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub unread_count: u32,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(alias = "sender", deserialize_with = "null_default")]
    pub sender_id: String,
    #[serde(alias = "receiverId", alias = "receiver", deserialize_with = "null_default")]
    pub recipient_id: String,
    #[serde(alias = "text", alias = "message", deserialize_with = "null_default")]
    pub content: String,
    #[serde(alias = "read", deserialize_with = "null_default")]
    pub is_read: bool,
    #[serde(alias = "createdAt", deserialize_with = "null_default")]
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KycRequest {
    #[serde(alias = "_id", deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub seller_id: String,
    #[serde(alias = "businessName", deserialize_with = "null_default")]
    pub seller_name: String,
    #[serde(deserialize_with = "null_default")]
    pub document_type: String,
    pub document_url: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub status: KycStatus,
    pub reason: Option<String>,
    #[serde(alias = "createdAt")]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SellerProfile {
    #[serde(flatten)]
    pub seller: Seller,
    pub description: Option<String>,
    pub kyc_status: Option<KycStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SellerStats {
    #[serde(deserialize_with = "null_default")]
    pub total_products: u32,
    #[serde(deserialize_with = "null_default")]
    pub total_services: u32,
    #[serde(deserialize_with = "null_default")]
    pub unread_messages: u32,
    #[serde(deserialize_with = "null_default")]
    pub profile_views: u32,
    #[serde(deserialize_with = "null_default")]
    pub total_reviews: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminStats {
    #[serde(deserialize_with = "null_default")]
    pub total_sellers: u32,
    #[serde(deserialize_with = "null_default")]
    pub total_buyers: u32,
    #[serde(deserialize_with = "null_default")]
    pub pending_kyc: u32,
    #[serde(deserialize_with = "null_default")]
    pub active_listings: u32,
    #[serde(deserialize_with = "null_default")]
    pub suspended_sellers: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "accessToken")]
    pub token: String,
    pub role: Role,
    #[serde(alias = "id")]
    pub user_id: String,
    pub seller_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyerRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRegistration {
    pub business_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub category: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordReset {
    pub token: String,
    pub password: String,
}

/// A file attached to a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Payload for a listing upload; only lives until the POST succeeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewListing {
    pub name: String,
    pub category: String,
    pub price: i64,
    pub quantity: u32,
    pub description: Option<String>,
    pub images: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KycSubmission {
    pub document_type: String,
    pub document_number: String,
    pub document: Attachment,
}

/// Pull an array out of a loosely shaped response: either a bare array or
/// one of `keys` holding one.
pub fn extract_list(json: &Value, keys: &[&str]) -> Vec<Value> {
    if let Some(arr) = json.as_array() {
        return arr.clone();
    }
    keys.iter()
        .find_map(|k| json.get(*k).and_then(|v| v.as_array()))
        .cloned()
        .unwrap_or_default()
}

/// Decode every element of an envelope list, skipping entries that don't fit.
pub fn decode_list<T: DeserializeOwned>(json: &Value, keys: &[&str]) -> Vec<T> {
    extract_list(json, keys)
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(v) => Some(v),
            Err(e) => {
                log::debug!("[models] skipping malformed entry: {e}");
                None
            }
        })
        .collect()
}

/// Decode a single record that may be wrapped in `data` or one of `keys`.
pub fn decode_one<T: DeserializeOwned>(json: Value, keys: &[&str]) -> Result<T> {
    let wrapped = keys
        .iter()
        .chain(["data"].iter())
        .find_map(|k| json.get(*k).filter(|v| v.is_object()).cloned());
    serde_json::from_value(wrapped.unwrap_or(json)).map_err(ApiError::from)
}

/// Admin decision on a KYC request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KycDecision {
    Approve,
    Reject { reason: String },
}

impl KycDecision {
    pub fn segment(&self) -> &'static str {
        match self {
            KycDecision::Approve => "approve",
            KycDecision::Reject { .. } => "reject",
        }
    }

    pub fn status(&self) -> KycStatus {
        match self {
            KycDecision::Approve => KycStatus::Approved,
            KycDecision::Reject { .. } => KycStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellerAction {
    Suspend,
    Activate,
}

impl SellerAction {
    pub fn segment(&self) -> &'static str {
        match self {
            SellerAction::Suspend => "suspend",
            SellerAction::Activate => "activate",
        }
    }

    pub fn status(&self) -> SellerStatus {
        match self {
            SellerAction::Suspend => SellerStatus::Suspended,
            SellerAction::Activate => SellerStatus::Active,
        }
    }
}
