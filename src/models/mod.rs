pub mod job;
pub mod params;
pub mod response;
