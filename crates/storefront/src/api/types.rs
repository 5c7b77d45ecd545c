//! Backend API data types.
//!
//! These mirror the JSON the backend sends (snake case). Fields the backend
//! is known to leave out or send as `null` are optional or defaulted so a
//! sparse record never fails a whole page.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use diag_wheels_core::category::category_path;
use diag_wheels_core::pricing::PriceTier;
use diag_wheels_core::{
    AnnouncementId, BlogPostId, CourseRequestId, DigitalFileFormat, KycId, KycStatus,
    NotificationId, OrderId, OrderStatus, ProductId, ProductType, RequestStatus, UserId, UserRole,
    UserType,
};

/// Shown when a product has no cover image.
pub const FALLBACK_PRODUCT_IMAGE: &str =
    "https://images.unsplash.com/photo-1486262715619-67b85e0b08d3?w=800&h=600&fit=crop";

/// Counts arrive as numbers, numeric strings (Postgres `bigint`), or `null`.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Count::Number(n)) => Ok(n),
        Some(Count::Text(text)) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Treat `null` like a missing array.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ─────────────────────────────────────────────────────────────────────────────
// Users & Auth
// ─────────────────────────────────────────────────────────────────────────────

/// An account as returned by `/auth/profile` and the admin user list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

impl User {
    /// "First Last", falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// Login and registration result.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub user: User,
    #[serde(alias = "access_token")]
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Products
// ─────────────────────────────────────────────────────────────────────────────

/// A shop product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    /// Category path, root first.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub categories: Vec<String>,
    #[serde(rename = "type", alias = "product_type", default)]
    pub product_type: ProductType,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub rating: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reviews_count: u64,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub digital_file_name: Option<String>,
    #[serde(default)]
    pub digital_file_format: Option<DigitalFileFormat>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub quantity_pricing: Vec<PriceTier>,
}

impl Product {
    /// Digital products are always available; physical ones follow
    /// `in_stock`, then the stock count.
    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        match self.product_type {
            ProductType::Digital => true,
            ProductType::Physical => self
                .in_stock
                .unwrap_or_else(|| self.stock_quantity.unwrap_or(0) > 0),
        }
    }

    /// Whether the product is listed (missing flag means active).
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    /// Category path, root first.
    #[must_use]
    pub fn category_path(&self) -> Vec<&str> {
        category_path(&self.categories, self.category.as_deref())
    }

    /// Leaf category for badges, or "Other".
    #[must_use]
    pub fn category_label(&self) -> &str {
        self.category_path().last().copied().unwrap_or("Other")
    }

    /// Cover image or the stock fallback.
    #[must_use]
    pub fn image(&self) -> &str {
        self.cover_image
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(FALLBACK_PRODUCT_IMAGE)
    }

    /// Description, or the default blurb for the product type.
    #[must_use]
    pub fn description_text(&self) -> &str {
        match self.description.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => match self.product_type {
                ProductType::Digital => "Digital product. Download available after payment.",
                ProductType::Physical => "Physical product. Shipping available.",
            },
        }
    }

    /// Specification bullet points for the detail page.
    #[must_use]
    pub fn specifications(&self) -> Vec<String> {
        match self.product_type {
            ProductType::Digital => vec![
                "Instant download after payment".to_string(),
                format!(
                    "Format: {}",
                    self.digital_file_format
                        .map_or("DIGITAL", |format| format.label())
                ),
                self.digital_file_name.as_ref().map_or_else(
                    || "File provided after purchase".to_string(),
                    |name| format!("File: {name}"),
                ),
                "Access available in My Downloads".to_string(),
            ],
            ProductType::Physical => vec![
                "Shipping available".to_string(),
                if self.is_in_stock() { "In stock" } else { "Out of stock" }.to_string(),
                "Ships after payment confirmation".to_string(),
            ],
        }
    }

    /// Feature bullet points for the detail page.
    #[must_use]
    pub const fn features(&self) -> [&'static str; 3] {
        match self.product_type {
            ProductType::Digital => [
                "Secure download link",
                "Access from any device after login",
                "Admin can grant free access",
            ],
            ProductType::Physical => ["Quality checked", "Fast shipping", "Support available"],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders & Payments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
    /// Omitted for digital-only carts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default, alias = "name")]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub line_total: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    pub total: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub payment_provider: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

/// Row in the admin orders table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOrderSummary {
    pub id: OrderId,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    pub total: Decimal,
    #[serde(default, deserialize_with = "lenient_count")]
    pub physical_items: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub digital_items: u64,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkPaidRequest {
    pub payment_provider: String,
    pub payment_reference: String,
}

/// Gateway order prepared by the backend for Razorpay checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub key_id: String,
    pub razorpay_order_id: String,
    /// Paise.
    pub amount: i64,
    pub currency: String,
    pub internal_order_id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayVerifyRequest {
    pub internal_order_id: OrderId,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// A digital product the user may download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEntitlement {
    pub product_id: ProductId,
    #[serde(default, alias = "name")]
    pub product_name: Option<String>,
    #[serde(default, alias = "slug")]
    pub product_slug: Option<String>,
    #[serde(default)]
    pub digital_file_name: Option<String>,
    #[serde(default)]
    pub digital_file_format: Option<DigitalFileFormat>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub granted_at: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrantEntitlementRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Blog
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: BlogPostId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub views: u64,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub tags: Vec<String>,
}

impl BlogPost {
    /// Publication timestamp, falling back to creation.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.published_at.as_deref().or(self.created_at.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogPagination {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default, rename = "hasMore")]
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogPage {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub data: Vec<BlogPost>,
    #[serde(default)]
    pub pagination: BlogPagination,
}

// ─────────────────────────────────────────────────────────────────────────────
// KYC
// ─────────────────────────────────────────────────────────────────────────────

/// Product KYC verification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductKyc {
    pub id: KycId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub id_proofs: Vec<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub business_proofs: Vec<String>,
    #[serde(default)]
    pub status: KycStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectKycRequest<'a> {
    pub rejection_reason: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Terms, Progress & Course Requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermsStatus {
    pub course_terms_accepted: bool,
    pub course_terms_accepted_at: Option<String>,
    pub product_terms_accepted: bool,
    pub product_terms_accepted_at: Option<String>,
    pub user_type: Option<UserType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoProgress {
    pub video_id: String,
    pub is_watched: bool,
    pub is_unlocked: bool,
    pub watched_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseProgress {
    pub course_id: Option<String>,
    #[serde(deserialize_with = "nullable_vec")]
    pub videos: Vec<VideoProgress>,
    #[serde(deserialize_with = "lenient_count")]
    pub completed_videos: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub total_videos: u64,
    pub progress_percentage: Option<Decimal>,
}

impl CourseProgress {
    #[must_use]
    pub fn video(&self, video_id: &str) -> Option<&VideoProgress> {
        self.videos.iter().find(|v| v.video_id == video_id)
    }
}

/// A course the user is enrolled in. `course_id` is the course slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledCourse {
    #[serde(alias = "slug")]
    pub course_id: String,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub enrolled_at: Option<String>,
    #[serde(default)]
    pub progress_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRequest {
    pub id: CourseRequestId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub course_id: String,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCourseRequest<'a> {
    pub course_id: &'a str,
    pub course_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Notification {
    /// In-app link carried in `data.url`, if any.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .get("url")?
            .as_str()
            .filter(|url| url.starts_with('/'))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationList {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub notifications: Vec<Notification>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub unread_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Browser push subscription, as produced by `PushSubscription.toJSON()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    #[serde(deserialize_with = "lenient_count")]
    pub total_users: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub total_courses: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub pending_requests: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub total_requests: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub approved_requests: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub rejected_requests: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    #[serde(deserialize_with = "lenient_count")]
    pub page: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub limit: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub total: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub pages: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPage {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub users: Vec<User>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestPage {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub requests: Vec<CourseRequest>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserUpdate<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSession {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Option<String>,
    pub last_activity: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginDetails {
    pub user: User,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub sessions: Vec<LoginSession>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub active_sessions_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_sessions_count: u64,
}

/// Severity of a site-wide announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementKind {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

impl AnnouncementKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Who sees an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    All,
    Users,
    Admins,
}

impl Audience {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Users => "users",
            Self::Admins => "admins",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub target_audience: Audience,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnnouncement {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub target_audience: Audience,
}
