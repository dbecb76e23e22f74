// Crate root library declaration and module exports.
pub mod cli;
pub mod config;
pub mod context;
pub mod model;
pub mod remind;

use anyhow::Result;

/// Parses `raw_ics` and renders it with `options`. Tasks without any date are
/// due "now".
pub fn convert(raw_ics: &str, options: &remind::FormatOptions) -> Result<String> {
    let calendar = model::load(raw_ics)?;
    let ctx = remind::FormatContext::new(options.clone());
    Ok(remind::render(&calendar, &ctx)?)
}
