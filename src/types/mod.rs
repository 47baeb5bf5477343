pub mod columns;
pub mod observation;
pub mod station;
