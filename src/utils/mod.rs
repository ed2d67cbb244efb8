pub mod encoding;
pub mod logging;
pub mod path_resolver;
pub mod validation;
