pub mod health;
pub mod internal;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod register;
pub mod roles;
