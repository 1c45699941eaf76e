pub mod authoring;
pub mod resolver;
pub mod slug;

pub use authoring::{AuthoringError, ShowcaseAuthor, ShowcaseDraft};
pub use resolver::{count_visible, resolve_banners, resolve_by_slug, visibility_status};
pub use slug::{clean_slug, derive_slug};
