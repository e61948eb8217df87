pub mod announcements;
pub mod assets;
pub mod row_match;
pub mod salah;
pub mod sync;
pub mod tabular;
pub mod time_format;
