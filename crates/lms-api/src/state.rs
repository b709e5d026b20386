//! Application state.

use lms_checkout::GatewayClient;
use lms_firestore::{
    CategoryRepository, CourseRepository, OrderRepository, ReviewRepository, StoreClient,
    UserRepository,
};

use crate::config::ApiConfig;
use crate::services::{EnrollmentService, Mailer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub courses: CourseRepository,
    pub reviews: ReviewRepository,
    pub users: UserRepository,
    pub categories: CategoryRepository,
    pub orders: OrderRepository,
    pub gateway: GatewayClient,
    pub mailer: Mailer,
    pub enrollment: EnrollmentService,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = StoreClient::from_env().await?;
        let gateway = GatewayClient::from_env()?;
        let mailer = Mailer::from_env()?;

        let courses = CourseRepository::new(store.clone());
        let users = UserRepository::new(store.clone());
        let enrollment =
            EnrollmentService::new(store.clone(), courses.clone(), users.clone());

        Ok(Self {
            config,
            courses,
            reviews: ReviewRepository::new(store.clone()),
            users,
            categories: CategoryRepository::new(store.clone()),
            orders: OrderRepository::new(store),
            gateway,
            mailer,
            enrollment,
        })
    }
}
