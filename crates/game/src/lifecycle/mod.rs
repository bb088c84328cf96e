mod context;
mod controller;

pub use context::LifecycleContext;
pub use controller::EntityLifecycleController;
