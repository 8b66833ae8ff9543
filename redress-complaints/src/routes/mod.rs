pub mod admin;
pub mod admins;
pub mod attachments;
pub mod categories;
pub mod complaints;
pub mod health;
pub mod messages;
