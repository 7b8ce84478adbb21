pub mod auth;
pub mod reviews;
pub mod taxonomy;
pub mod titles;
pub mod users;

use verdict_kernel::ModuleRegistry;

use crate::state::AppState;
use taxonomy::models::Taxonomy;

/// Register every feature module. Migrations run in this order, so tables
/// are registered before the tables that reference them.
pub fn register_all(registry: &mut ModuleRegistry, state: &AppState) {
    registry.register(users::create_module(state.clone()));
    registry.register(taxonomy::create_module(Taxonomy::Categories, state.clone()));
    registry.register(taxonomy::create_module(Taxonomy::Genres, state.clone()));
    registry.register(titles::create_module(state.clone()));
    registry.register(reviews::create_module(state.clone()));
    registry.register(auth::create_module(state.clone()));
}
