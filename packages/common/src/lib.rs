pub mod api;
pub mod retry;
pub mod signing;
pub mod video_status;

pub use signing::SignatureAlgorithm;
pub use video_status::VideoStatus;
