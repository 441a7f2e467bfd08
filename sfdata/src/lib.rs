pub mod finder;
pub mod fs;
pub mod pipeline;
pub mod registry;
pub mod testing;
pub mod validation;

// Re-export the types most callers need
pub use finder::{Channel, GameFinder, ResolutionOptions, ResolveError, find_game};
pub use pipeline::{Exporter, ExtractSummary, GameLayout, Umodel, extract_game_assets};
pub use validation::{Test, ValidationError, ValidationMode, Validator};
