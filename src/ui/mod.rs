pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, language, muted, section, success, warn};
pub use table::{LayerRow, layer_table};
pub use theme::theme;
