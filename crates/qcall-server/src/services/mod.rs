//! Background services

pub mod retention;
