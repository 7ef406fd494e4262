pub mod budget;
pub mod category;
pub mod feedback;
pub mod transaction;
pub mod user;
