// Derived-view and mutation services composing the stores

pub mod engagement;
pub mod ranking;
pub mod recommendation;
pub mod social;

pub use engagement::EngagementService;
pub use ranking::RankingService;
pub use recommendation::RecommendationService;
pub use social::SocialService;
