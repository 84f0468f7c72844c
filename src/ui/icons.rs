pub struct Icons;

impl Icons {
    pub const TREE: &str = "🌳";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
}
