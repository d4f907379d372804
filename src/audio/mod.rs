pub mod analysis;
pub mod decode;
pub mod pitch;
pub mod spectral;
pub mod window;
