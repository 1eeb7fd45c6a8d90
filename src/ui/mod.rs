pub mod icons;
pub mod output;
pub mod theme;

pub use icons::Icons;
pub use output::{coordinate, error, header, info, resolution, success, warn};
pub use theme::{theme, Theme};
