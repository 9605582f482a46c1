pub mod engine;
pub mod reconcile;

pub use engine::Tracer;
pub use reconcile::reconcile;
