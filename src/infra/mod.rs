pub mod receptor;
pub mod web;
