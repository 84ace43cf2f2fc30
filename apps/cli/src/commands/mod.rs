pub mod gdir;
pub mod params;
pub mod tasks;
