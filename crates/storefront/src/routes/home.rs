//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::api::{BlogPost, Product, ProductQuery};
use crate::content::Course;
use crate::filters;
use crate::routes::PageContext;
use crate::state::AppState;

/// Number of courses featured on the home page.
const FEATURED_COURSES: usize = 3;
/// Number of products featured on the home page.
const FEATURED_PRODUCTS: usize = 4;
/// Number of recent blog posts on the home page.
const RECENT_POSTS: usize = 3;

/// Intro video shown in the hero.
const HERO_VIDEO: &str = "https://www.youtube-nocookie.com/embed/IIBU1v3Ae0E";

/// A "why choose us" card.
#[derive(Clone)]
pub struct Feature {
    pub image: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

const FEATURES: [Feature; 4] = [
    Feature {
        image: "https://images.unsplash.com/photo-1486262715619-67b85e0b08d3?w=400&h=300&fit=crop",
        title: "Expert Courses",
        description: "Comprehensive courses covering ADAS, EV systems, diagnostics, and more",
    },
    Feature {
        image: "https://images.unsplash.com/photo-1605559424843-9e4c228bf1c2?w=400&h=300&fit=crop",
        title: "Learn from Experts",
        description: "Taught by certified automotive professionals with years of experience",
    },
    Feature {
        image: "https://images.unsplash.com/photo-1619642751034-765dfdf7c58e?w=400&h=300&fit=crop",
        title: "Certification",
        description: "Earn certificates upon completion to boost your career",
    },
    Feature {
        image: "https://images.unsplash.com/photo-1581091226825-a6a2a5aee158?w=400&h=300&fit=crop",
        title: "Hands-on Tools",
        description: "Diagnostic hardware and software from our own shop",
    },
];

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub hero_video: &'static str,
    pub features: &'static [Feature],
    pub courses: Vec<Course>,
    pub products: Vec<Product>,
    pub posts: Vec<BlogPost>,
}

/// Display the home page.
///
/// Product and blog sections are left out when the backend is unavailable
/// rather than failing the whole page.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let courses = state
        .content()
        .courses()
        .iter()
        .take(FEATURED_COURSES)
        .cloned()
        .collect();

    let products = match state.api().list_products(&ProductQuery::default()).await {
        Ok(products) => products
            .iter()
            .filter(|p| p.is_listed())
            .take(FEATURED_PRODUCTS)
            .cloned()
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to fetch featured products: {e}");
            Vec::new()
        }
    };

    let posts = match state.api().list_posts(0, None).await {
        Ok(page) => page.data.iter().take(RECENT_POSTS).cloned().collect(),
        Err(e) => {
            tracing::warn!("Failed to fetch recent posts: {e}");
            Vec::new()
        }
    };

    HomeTemplate {
        ctx,
        hero_video: HERO_VIDEO,
        features: &FEATURES,
        courses,
        products,
        posts,
    }
}
