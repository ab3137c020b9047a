pub mod hours;

pub use hours::HoursService;
