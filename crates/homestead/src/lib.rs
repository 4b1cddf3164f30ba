//! Homestead property management: marketing pages, organizations and their
//! properties, maintenance requests, and the account flows around them.

pub mod accounts;
pub mod config;
pub mod error;
pub mod forms;
pub mod html;
pub mod pages;
pub mod properties;
pub mod telemetry;
pub mod web;

#[cfg(test)]
mod testing;
