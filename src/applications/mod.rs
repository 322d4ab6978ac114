pub mod canary;
pub mod naming;
pub mod version;

pub use canary::is_canary_auxiliary;
pub use naming::{normalize, normalize_edit_name, to_valid_name};
pub use version::extract_version;
