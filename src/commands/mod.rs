pub mod compare;
pub mod list_services;
