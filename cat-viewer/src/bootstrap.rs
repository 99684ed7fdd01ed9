use crate::cat_api::CatApi;
use crate::container::ServiceContainer;
use crate::orchestrator::Orchestrator;
use crate::swap::MediaSwapController;
use crate::traits::{CatService, RandomSource, ThreadRandom};
use crate::types::{CatView, MediaSurface, Result, ViewerConfig};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG: &str = "config";
pub const RANDOM: &str = "random";
pub const CAT_SERVICE: &str = "catService";
pub const VIEW: &str = "view";
pub const SURFACE: &str = "surface";
pub const SWAP_CONTROLLER: &str = "swapController";
pub const ORCHESTRATOR: &str = "orchestrator";

/// Register the default services. Keys the caller already registered are
/// left alone, so tests and front ends can provide their own. `view` and
/// `surface` have no default and must be registered by the caller.
pub fn register_services(container: &mut ServiceContainer, config: ViewerConfig) -> Result<()> {
    if !container.has(CONFIG) {
        let config = Arc::new(config);
        container.register::<ViewerConfig, _>(CONFIG, move |_| Ok(config.clone()))?;
    }

    if !container.has(RANDOM) {
        container.register::<dyn RandomSource, _>(RANDOM, |_| Ok(Arc::new(ThreadRandom)))?;
    }

    if !container.has(CAT_SERVICE) {
        container.register::<dyn CatService, _>(CAT_SERVICE, |c| {
            let config = c.get::<ViewerConfig>(CONFIG)?;
            Ok(Arc::new(CatApi::new(&config)?))
        })?;
    }

    if !container.has(SWAP_CONTROLLER) {
        container.register::<MediaSwapController, _>(SWAP_CONTROLLER, |c| {
            let surface = c.get::<dyn MediaSurface>(SURFACE)?;
            Ok(Arc::new(MediaSwapController::new(surface)))
        })?;
    }

    if !container.has(ORCHESTRATOR) {
        container.register::<Orchestrator, _>(ORCHESTRATOR, |c| {
            let config = c.get::<ViewerConfig>(CONFIG)?;
            Ok(Arc::new(Orchestrator::new(
                c.get::<dyn CatService>(CAT_SERVICE)?,
                c.get::<dyn CatView>(VIEW)?,
                c.get::<MediaSwapController>(SWAP_CONTROLLER)?,
                c.get::<dyn RandomSource>(RANDOM)?,
                Duration::from_millis(config.swap_timeout_ms),
            )))
        })?;
    }

    Ok(())
}
