pub mod db;
pub mod repositories;
pub mod settings_store;
