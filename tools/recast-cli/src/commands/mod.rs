pub mod export;
pub mod info;
pub mod plan;
pub mod validate;
