pub mod signature;
pub mod transcode;
pub mod video;
pub mod webhook;
