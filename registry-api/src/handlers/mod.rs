pub mod app;
mod students;

pub use app::add_routes;
