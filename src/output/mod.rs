pub mod json;
pub mod midi;
