pub mod datetime;
pub mod files;
pub mod hashing;
pub mod html;
pub mod ids;
