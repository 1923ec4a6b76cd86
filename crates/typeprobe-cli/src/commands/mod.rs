pub mod check;
pub mod version;
