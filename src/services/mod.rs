pub mod bootcamp_service;
pub mod course_service;
pub mod geocoder;
pub mod listing;
pub mod populate;
pub mod review_service;
pub mod seed_service;
pub mod user_service;

pub use bootcamp_service::BootcampService;
pub use course_service::CourseService;
pub use geocoder::Geocoder;
pub use listing::Listing;
pub use review_service::ReviewService;
pub use seed_service::{SeedError, SeedService};
pub use user_service::UserService;
