pub mod challenge;
pub mod fetch;
