pub mod adjust;
pub mod error;
pub mod generator;
pub mod normalize;
pub mod service;
pub mod store;

pub use error::SkillMapError;
pub use service::SkillMapService;
