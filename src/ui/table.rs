use tabled::{Table, Tabled, settings::Style};

/// One layer of a layered tree, flattened for display
#[derive(Tabled)]
pub struct LayerRow {
    #[tabled(rename = "Layer")]
    pub layer: String,
    #[tabled(rename = "Regions")]
    pub regions: usize,
    #[tabled(rename = "Trees")]
    pub trees: usize,
    #[tabled(rename = "Ranges")]
    pub ranges: String,
}

pub fn layer_table(rows: &[LayerRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    Table::new(rows).with(Style::rounded()).to_string()
}
