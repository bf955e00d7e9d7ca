pub mod csrf;
pub mod display_id;
pub mod jwt;
