use mintty::Selector;

use crate::{Env, image, line, page};

/// Every block in this crate, with the line as the fallback.
///
/// Probes run line, page, image, so untagged data with a `text` field is
/// always read as a line.
pub fn standard_selector(env: &Env) -> Selector {
    Selector::new(line::ui(env))
        .register(page::ui(env))
        .register(image::ui(env))
        .probe(line::NAME, line::is_line)
        .probe(page::NAME, page::is_page)
        .probe(image::NAME, image::is_image)
}
