pub mod feedback;
pub mod interview;
pub mod transcript;
pub mod user;
