// Rendering: record sanitizing, layout merging, and headless-browser PDF export.

pub mod chromium;
pub mod engine;
pub mod helpers;
pub mod sanitizer;
pub mod templates;
