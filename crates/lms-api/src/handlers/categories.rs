//! Category handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use lms_models::{Category, CategoryId, CourseStatus};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::courses::CourseSummary;
use crate::response::{ok, ApiOk};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1..=100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
pub struct CategoryView {
    pub category_id: String,
    pub name: String,
    pub description: String,
    pub course_count: usize,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            category_id: category.category_id.0.clone(),
            name: category.name.clone(),
            description: category.description.clone(),
            course_count: category.courses.len(),
        }
    }
}

/// Create a catalog category (admin only).
pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<ApiOk<CategoryView>> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let category = Category::new(payload.name, payload.description);
    state.categories.create(&category).await?;

    info!(category = %category.category_id, admin = %user.user_id, "Category created");
    Ok(ok(CategoryView::from(&category)))
}

/// List all categories.
pub async fn show_all_categories(
    State(state): State<AppState>,
) -> ApiResult<ApiOk<Vec<CategoryView>>> {
    let categories = state.categories.list_all().await?;
    Ok(ok(categories.iter().map(CategoryView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CategoryPageRequest {
    pub category_id: String,
}

#[derive(Serialize)]
pub struct CategoryPageResponse {
    pub selected_category: CategoryView,
    pub selected_courses: Vec<CourseSummary>,
    /// Courses from one other category, for the "you may also like" rail
    pub different_category_courses: Vec<CourseSummary>,
    /// Most-enrolled published courses across the catalog
    pub most_selling_courses: Vec<CourseSummary>,
}

/// Category landing page: the category's published courses, a second
/// category's courses and the catalog's top sellers.
pub async fn category_page_details(
    State(state): State<AppState>,
    Json(payload): Json<CategoryPageRequest>,
) -> ApiResult<ApiOk<CategoryPageResponse>> {
    let category_id = CategoryId::from(payload.category_id);
    let selected = state
        .categories
        .get(&category_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let resolved = state.courses.batch_get(&selected.courses).await?;
    let selected_courses: Vec<CourseSummary> = selected
        .courses
        .iter()
        .filter_map(|id| resolved.get(id))
        .filter(|c| c.status == CourseStatus::Published)
        .map(CourseSummary::from)
        .collect();

    let different_category_courses = match state
        .categories
        .list_all()
        .await?
        .into_iter()
        .find(|c| c.category_id != category_id && !c.courses.is_empty())
    {
        Some(other) => {
            let other_resolved = state.courses.batch_get(&other.courses).await?;
            other
                .courses
                .iter()
                .filter_map(|id| other_resolved.get(id))
                .filter(|c| c.status == CourseStatus::Published)
                .map(CourseSummary::from)
                .collect()
        }
        None => Vec::new(),
    };

    let mut all_published = state.courses.list_published().await?;
    all_published.sort_by(|a, b| b.students_enrolled.len().cmp(&a.students_enrolled.len()));
    let most_selling_courses = all_published
        .iter()
        .take(10)
        .map(CourseSummary::from)
        .collect();

    Ok(ok(CategoryPageResponse {
        selected_category: CategoryView::from(&selected),
        selected_courses,
        different_category_courses,
        most_selling_courses,
    }))
}
