// Metadata extraction - layered fallback chain
//
// - Embed info: structured oEmbed response (title, duration, thumbnail, size)
// - Page markup: pattern matching on the share page HTML
//
// The resolver tries them in order and never fails; the video id is the
// title of last resort.

mod embed;
mod orchestrator;
mod page;
mod traits;

pub use embed::EmbedInfoExtractor;
pub use orchestrator::MetadataResolver;
pub use page::{title_from_markup, PageMarkupExtractor};
pub use traits::MetadataExtractor;
