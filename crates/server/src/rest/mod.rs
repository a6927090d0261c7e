mod health;
mod kapacitors;
mod params;
mod proxy;
mod router;
mod rules;

pub use kapacitors::{KapaLinks, KapacitorResponse, KapacitorsResponse};
pub use router::{router, AppState};
