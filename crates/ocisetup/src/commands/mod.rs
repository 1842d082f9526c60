pub mod fingerprint;
pub mod setup;
pub mod show;
pub mod verify;
