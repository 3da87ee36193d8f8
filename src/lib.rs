pub mod core;
pub mod db;
pub mod domain;
pub mod utils;
