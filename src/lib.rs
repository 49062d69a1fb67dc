pub mod ai;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod models;
pub mod web;
