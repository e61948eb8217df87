pub mod announcement;
pub mod asset;
pub mod salah;
