pub mod types;
pub mod traits;
pub mod utils;
pub mod container;
pub mod cat_api;
pub mod surprise;
pub mod swap;
pub mod surface;
pub mod console;
pub mod orchestrator;
pub mod bootstrap;

pub use types::*;
pub use traits::{CatService, RandomSource, ThreadRandom};
pub use container::ServiceContainer;
pub use cat_api::CatApi;
pub use swap::{MediaSlot, MediaSwapController};
pub use surface::HttpMediaSurface;
pub use console::ConsoleView;
pub use orchestrator::Orchestrator;
