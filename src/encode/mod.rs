pub mod adaptive;
pub mod jpeg;
