//! In-process stand-in for the Diag Wheels backend REST API.
//!
//! Serves the `{ success, message?, data? }` envelope for the endpoints the
//! storefront calls during the integration tests, and records the writes it
//! receives so tests can assert on them.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Password accepted for every fake account.
pub const PASSWORD: &str = "correct-horse-battery";

/// A student enrolled in the diagnostic tools course.
pub const STUDENT_EMAIL: &str = "asha@diagwheels.test";

/// An admin account.
pub const ADMIN_EMAIL: &str = "admin@diagwheels.test";

/// An account whose token the backend stops accepting after login.
pub const EXPIRED_EMAIL: &str = "expired@diagwheels.test";

/// Course the student is enrolled in.
pub const ENROLLED_COURSE: &str = "diagnostic-tools";

/// Writes the backend has seen.
#[derive(Debug, Default)]
pub struct Recorded {
    pub product_terms_accepted: bool,
    pub orders: Vec<Value>,
    pub verified_payments: Vec<Value>,
    pub course_requests: Vec<Value>,
    pub watched_videos: Vec<String>,
    pub approved_requests: Vec<String>,
    pub logouts: u32,
    /// Razorpay order requests, by internal order id.
    pub payment_orders: Vec<String>,
    /// How many upcoming Razorpay order requests fail.
    pub payment_start_failures: u32,
    pub kyc_submissions: u32,
    pub business_upgrades: u32,
}

/// Handle to a running fake backend.
#[derive(Clone)]
pub struct FakeBackend {
    pub addr: SocketAddr,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeBackend {
    /// Start the backend on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");

        let app = router(Arc::clone(&recorded));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, recorded }
    }

    /// Base URL the storefront should use, ending in `/api/`.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Everything recorded so far.
    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type Shared = Arc<Mutex<Recorded>>;

fn lock(state: &Shared) -> MutexGuard<'_, Recorded> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(profile))
        .route("/products", get(products))
        .route("/products/{slug}", get(product))
        .route("/blogs", get(blogs))
        .route("/blogs/{slug}", get(blog))
        .route("/terms/status", get(terms_status))
        .route("/terms/product/accept", post(accept_product_terms))
        .route("/users/courses", get(enrolled_courses))
        .route("/course-requests", get(my_course_requests).post(create_course_request))
        .route("/course-requests/admin/all", get(all_course_requests))
        .route("/course-requests/{id}/approve", put(approve_course_request))
        .route("/progress/courses/{course}", get(course_progress))
        .route("/progress/videos/{video}/watch", post(watch_video))
        .route("/progress/videos/{video}/unlock-next", post(unlock_next))
        .route("/orders", get(my_orders).post(create_order))
        .route("/payments/razorpay/order", post(razorpay_order))
        .route("/payments/razorpay/verify", post(razorpay_verify))
        .route("/product-kyc", post(submit_product_kyc))
        .route("/product-kyc/me", get(my_product_kyc))
        .route("/kyc/upgrade-to-business", post(upgrade_to_business))
        .route("/admin/dashboard", get(dashboard))
        .fallback(not_found);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .with_state(state)
}

// =============================================================================
// Envelope helpers
// =============================================================================

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn ok_message(message: &str) -> Response {
    Json(json!({ "success": true, "message": message })).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

async fn not_found() -> Response {
    fail(StatusCode::NOT_FOUND, "Not found")
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Account {
    Student,
    Admin,
    Expired,
}

impl Account {
    fn from_email(email: &str) -> Option<Self> {
        match email {
            STUDENT_EMAIL => Some(Self::Student),
            ADMIN_EMAIL => Some(Self::Admin),
            EXPIRED_EMAIL => Some(Self::Expired),
            _ => None,
        }
    }

    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let token = headers
            .get("authorization")?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        match token {
            "token-student" => Some(Self::Student),
            "token-admin" => Some(Self::Admin),
            _ => None,
        }
    }

    const fn token(self) -> &'static str {
        match self {
            Self::Student => "token-student",
            Self::Admin => "token-admin",
            Self::Expired => "token-expired",
        }
    }

    fn user(self) -> Value {
        match self {
            Self::Student => json!({
                "id": "user-1",
                "email": STUDENT_EMAIL,
                "first_name": "Asha",
                "last_name": "Menon",
                "phone": "9876543210",
                "role": "user",
                "user_type": "student",
                "is_active": true
            }),
            Self::Admin => json!({
                "id": "user-2",
                "email": ADMIN_EMAIL,
                "first_name": "Ravi",
                "last_name": "Kumar",
                "role": "admin",
                "is_active": true
            }),
            Self::Expired => json!({
                "id": "user-3",
                "email": EXPIRED_EMAIL,
                "first_name": "Old",
                "last_name": "Session",
                "role": "user",
                "is_active": true
            }),
        }
    }
}

fn authorized(headers: &HeaderMap) -> Result<Account, Response> {
    Account::from_headers(headers).ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "jwt expired"))
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(Json(body): Json<LoginBody>) -> Response {
    match Account::from_email(&body.email) {
        Some(account) if body.password == PASSWORD => ok(json!({
            "user": account.user(),
            "token": account.token(),
        })),
        _ => fail(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

async fn logout(State(state): State<Shared>) -> Response {
    lock(&state).logouts += 1;
    ok_message("Logged out")
}

async fn profile(headers: HeaderMap) -> Response {
    match authorized(&headers) {
        Ok(account) => ok(account.user()),
        Err(response) => response,
    }
}

// =============================================================================
// KYC
// =============================================================================

/// The student has a KYC under review; nobody else has one on file.
async fn my_product_kyc(headers: HeaderMap) -> Response {
    match authorized(&headers) {
        Ok(Account::Student) => ok(json!({
            "id": "kyc-1",
            "user_email": STUDENT_EMAIL,
            "full_name": "Asha Menon",
            "address": "12 MG Road, Kochi",
            "contact_number": "9876543210",
            "whatsapp_number": "9876543210",
            "id_proofs": ["/uploads/kyc/aadhaar.png", "/uploads/kyc/pan.png"],
            "status": "pending"
        })),
        Ok(_) => not_found().await,
        Err(response) => response,
    }
}

async fn submit_product_kyc(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    lock(&state).kyc_submissions += 1;
    ok_message("KYC submitted")
}

async fn upgrade_to_business(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    lock(&state).business_upgrades += 1;
    ok_message("Upgraded to business owner")
}

// =============================================================================
// Catalog
// =============================================================================

fn catalog() -> Vec<Value> {
    vec![
        json!({
            "id": "prod-scanner",
            "name": "OBD-II Scanner Pro",
            "slug": "obd-scanner-pro",
            "description": "Full-system scanner with live data.",
            "price": "2499.00",
            "category": "Scanners",
            "categories": ["Tools", "Scanners"],
            "type": "physical",
            "stock_quantity": 12,
            "in_stock": true,
            "reviews_count": "4",
            "quantity_pricing": [
                { "min_qty": 1, "max_qty": 4, "price_per_item": "2499.00" },
                { "min_qty": 5, "max_qty": null, "price_per_item": "2199.00" }
            ]
        }),
        json!({
            "id": "prod-guide",
            "name": "ECU Pinout Library",
            "slug": "ecu-pinout-library",
            "description": null,
            "price": "999.00",
            "category": "Software",
            "categories": null,
            "type": "digital",
            "digital_file_name": "pinouts.zip",
            "digital_file_format": "zip"
        }),
        json!({
            "id": "prod-sold-out",
            "name": "TPMS Relearn Tool",
            "slug": "tpms-relearn-tool",
            "price": "3999.00",
            "category": "Tools",
            "type": "physical",
            "stock_quantity": 0,
            "in_stock": false
        }),
    ]
}

#[derive(Deserialize)]
struct ProductFilter {
    q: Option<String>,
    #[serde(rename = "type")]
    product_type: Option<String>,
}

async fn products(Query(filter): Query<ProductFilter>) -> Response {
    let q = filter.q.map(|q| q.to_lowercase());
    let listed: Vec<Value> = catalog()
        .into_iter()
        .filter(|p| {
            filter
                .product_type
                .as_deref()
                .is_none_or(|t| p["type"].as_str() == Some(t))
        })
        .filter(|p| {
            q.as_deref().is_none_or(|q| {
                p["name"]
                    .as_str()
                    .is_some_and(|name| name.to_lowercase().contains(q))
            })
        })
        .collect();
    ok(Value::Array(listed))
}

async fn product(Path(slug): Path<String>) -> Response {
    catalog()
        .into_iter()
        .find(|p| p["slug"].as_str() == Some(slug.as_str()))
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"), ok)
}

fn post_json() -> Value {
    json!({
        "id": "post-1",
        "slug": "reading-freeze-frame-data",
        "title": "Reading Freeze Frame Data",
        "excerpt": "What the snapshot tells you about an intermittent fault.",
        "content": "## Freeze frames\n\nA snapshot of sensor values at the moment a code set.",
        "author_name": "Diag Wheels",
        "published_at": "2026-09-01T10:00:00Z",
        "tags": ["obd", "diagnostics"]
    })
}

#[derive(Deserialize)]
struct BlogFilter {
    search: Option<String>,
}

async fn blogs(Query(filter): Query<BlogFilter>) -> Response {
    let posts = match filter.search.as_deref() {
        Some(search) if !"freeze frame".contains(&search.to_lowercase()) => Vec::new(),
        _ => vec![post_json()],
    };
    let total = posts.len();
    ok(json!({
        "data": posts,
        "pagination": { "total": total, "limit": 9, "offset": 0, "hasMore": false }
    }))
}

async fn blog(Path(slug): Path<String>) -> Response {
    let post = post_json();
    if post["slug"].as_str() == Some(slug.as_str()) {
        ok(post)
    } else {
        fail(StatusCode::NOT_FOUND, "Blog post not found")
    }
}

// =============================================================================
// Terms and courses
// =============================================================================

async fn terms_status(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    let accepted = lock(&state).product_terms_accepted;
    ok(json!({
        "course_terms_accepted": true,
        "product_terms_accepted": accepted,
        "user_type": "student"
    }))
}

async fn accept_product_terms(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    lock(&state).product_terms_accepted = true;
    ok_message("Product terms accepted")
}

async fn enrolled_courses(headers: HeaderMap) -> Response {
    match authorized(&headers) {
        Ok(Account::Student) => ok(json!([{
            "course_id": ENROLLED_COURSE,
            "course_name": "Diagnostic Tools",
            "enrolled_at": "2026-08-20T09:00:00Z",
            "progress_percentage": "0"
        }])),
        Ok(_) => ok(json!([])),
        Err(response) => response,
    }
}

async fn my_course_requests(State(state): State<Shared>, headers: HeaderMap) -> Response {
    match authorized(&headers) {
        Ok(_) => ok(Value::Array(lock(&state).course_requests.clone())),
        Err(response) => response,
    }
}

async fn create_course_request(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    let mut recorded = lock(&state);
    let request = json!({
        "id": format!("req-{}", recorded.course_requests.len() + 10),
        "course_id": body["course_id"],
        "course_name": body["course_name"],
        "message": body["message"],
        "status": "pending",
        "created_at": "2026-10-18T09:00:00Z"
    });
    recorded.course_requests.push(request.clone());
    ok(request)
}

async fn all_course_requests(headers: HeaderMap) -> Response {
    match authorized(&headers) {
        Ok(Account::Admin) => ok(json!([{
            "id": "req-1",
            "user_email": STUDENT_EMAIL,
            "first_name": "Asha",
            "last_name": "Menon",
            "course_id": "adas-calibration",
            "course_name": "ADAS Calibration",
            "status": "pending",
            "created_at": "2026-10-01T08:30:00Z"
        }])),
        Ok(_) => fail(StatusCode::FORBIDDEN, "Admin access required"),
        Err(response) => response,
    }
}

async fn approve_course_request(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    match authorized(&headers) {
        Ok(Account::Admin) => {
            lock(&state).approved_requests.push(id.clone());
            ok(json!({
                "id": id,
                "course_id": "adas-calibration",
                "status": "approved"
            }))
        }
        Ok(_) => fail(StatusCode::FORBIDDEN, "Admin access required"),
        Err(response) => response,
    }
}

async fn course_progress(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(course): Path<String>,
) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    let videos: Vec<Value> = lock(&state)
        .watched_videos
        .iter()
        .filter(|id| id.starts_with(&format!("{course}-")))
        .map(|id| json!({ "video_id": id, "is_watched": true, "is_unlocked": true }))
        .collect();
    ok(json!({
        "course_id": course,
        "completed_videos": videos.len(),
        "videos": videos,
    }))
}

async fn watch_video(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(video): Path<String>,
) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    lock(&state).watched_videos.push(video);
    ok_message("Video marked as watched")
}

async fn unlock_next(headers: HeaderMap, Path(_video): Path<String>) -> Response {
    match authorized(&headers) {
        Ok(_) => ok_message("Next video unlocked"),
        Err(response) => response,
    }
}

// =============================================================================
// Orders and payments
// =============================================================================

async fn my_orders(headers: HeaderMap) -> Response {
    match authorized(&headers) {
        Ok(_) => ok(json!([])),
        Err(response) => response,
    }
}

async fn create_order(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    let id = {
        let mut recorded = lock(&state);
        recorded.orders.push(body);
        format!("order-{}", recorded.orders.len())
    };
    ok(json!({
        "id": id,
        "status": "pending",
        "total": "5198.00",
        "currency": "INR",
        "items": []
    }))
}

async fn razorpay_order(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    {
        let mut recorded = lock(&state);
        recorded
            .payment_orders
            .push(body["order_id"].as_str().unwrap_or_default().to_string());
        if recorded.payment_start_failures > 0 {
            recorded.payment_start_failures -= 1;
            return fail(StatusCode::BAD_GATEWAY, "Payment gateway unavailable");
        }
    }
    ok(json!({
        "key_id": "rzp_test_backend",
        "razorpay_order_id": "order_rzp_1",
        "amount": 519_800,
        "currency": "INR",
        "internal_order_id": body["order_id"]
    }))
}

async fn razorpay_verify(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    if body["razorpay_signature"].as_str() != Some("valid-signature") {
        return fail(StatusCode::BAD_REQUEST, "Invalid payment signature");
    }
    lock(&state).verified_payments.push(body);
    ok_message("Payment verified successfully")
}

// =============================================================================
// Admin
// =============================================================================

async fn dashboard(headers: HeaderMap) -> Response {
    match authorized(&headers) {
        Ok(Account::Admin) => ok(json!({
            "total_users": "42",
            "total_courses": 9,
            "pending_requests": 1,
            "total_requests": 7,
            "approved_requests": 5,
            "rejected_requests": 1
        })),
        Ok(_) => fail(StatusCode::FORBIDDEN, "Admin access required"),
        Err(response) => response,
    }
}
