use crate::ui::{Icons, theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::TREE, text.style(theme().title.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().ok.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().failed.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().caution.clone()));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO, label.style(theme().label.clone()), value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().title.clone()));
}

pub fn language(id: &str) -> String {
    id.style(theme().language.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().detail.clone()).to_string()
}
